//! Deterministic per-cast and per-account metrics
//!
//! Everything here is pure: no I/O, no clocks except where a `now` is
//! passed in, and no failure modes. Empty input degrades to 0 or `None`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::models::{Cast, CastEngagement, CastMetrics, EngagementWeights, PerformanceRank, UserMetrics};

pub const DEFAULT_VELOCITY_WINDOW_HOURS: u32 = 6;
const DEFAULT_TOP_THRESHOLD: f64 = 0.2;
const DEFAULT_BOTTOM_THRESHOLD: f64 = 0.2;

/// Weighted engagement score for a cast.
/// Counts are assumed non-negative; the caller guarantees that.
pub fn engagement_score(engagement: &CastEngagement, weights: &EngagementWeights) -> f64 {
    engagement.replies_count as f64 * weights.reply
        + engagement.likes_count as f64 * weights.like
        + engagement.recasts_count as f64 * weights.recast
}

/// Fraction of replies that arrived within the first `window_hours` after
/// publication. Higher velocity means the cast sparked immediate
/// conversation. `None` when there are no replies to judge.
pub fn velocity_score(
    cast: &Cast,
    engagement: &CastEngagement,
    window_hours: u32,
) -> Option<f64> {
    if engagement.replies_count == 0 || engagement.replies.is_empty() {
        return None;
    }

    let window_end = cast.timestamp + Duration::hours(i64::from(window_hours));
    let early_replies = engagement
        .replies
        .iter()
        .filter(|r| r.timestamp <= window_end)
        .count();

    Some(early_replies as f64 / engagement.replies_count as f64)
}

/// Conversation depth proxy: log2(replies + 1).
/// Log scale dampens outliers without fetching full thread trees.
pub fn conversation_depth(engagement: &CastEngagement) -> f64 {
    if engagement.replies_count == 0 {
        return 0.0;
    }
    ((engagement.replies_count + 1) as f64).log2()
}

/// Compute all metrics for a single cast
pub fn compute_cast_metrics(
    cast: &Cast,
    engagement: &CastEngagement,
    weights: &EngagementWeights,
    velocity_window_hours: u32,
) -> CastMetrics {
    CastMetrics {
        cast_hash: cast.hash.clone(),
        engagement_score: engagement_score(engagement, weights),
        velocity_score: velocity_score(cast, engagement, velocity_window_hours),
        conversation_depth: conversation_depth(engagement),
        unique_repliers_count: engagement.unique_repliers.len() as u64,
        likes_count: engagement.likes_count,
        recasts_count: engagement.recasts_count,
        replies_count: engagement.replies_count,
    }
}

/// Standard median; 0 for empty input, mean of the two middle elements for
/// even-length input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Compute account-level aggregate metrics over the trailing window.
///
/// `replied_to_fids` is the set of accounts the user replied to, supplied
/// by the caller. Reciprocity is `None` when that set is empty so an
/// unobserved signal never shows up as a misleading 0%.
pub fn compute_user_metrics(
    fid: u64,
    casts: &[Cast],
    metrics_map: &HashMap<String, CastMetrics>,
    engagement_map: &HashMap<String, CastEngagement>,
    replied_to_fids: Option<&HashSet<u64>>,
    days_back: u32,
    now: DateTime<Utc>,
) -> UserMetrics {
    let window_start = now - Duration::days(i64::from(days_back));

    let recent_casts: Vec<&Cast> = casts
        .iter()
        .filter(|c| c.timestamp >= window_start)
        .collect();

    let engagement_scores: Vec<f64> = recent_casts
        .iter()
        .map(|c| {
            metrics_map
                .get(&c.hash)
                .map_or(0.0, |m| m.engagement_score)
        })
        .collect();

    let replies_counts: Vec<f64> = recent_casts
        .iter()
        .map(|c| {
            metrics_map
                .get(&c.hash)
                .map_or(0.0, |m| m.replies_count as f64)
        })
        .collect();

    // Reply rate: fraction of casts that got at least one reply
    let casts_with_reply = recent_casts
        .iter()
        .filter(|c| metrics_map.get(&c.hash).is_some_and(|m| m.replies_count > 0))
        .count();
    let reply_rate = if recent_casts.is_empty() {
        0.0
    } else {
        casts_with_reply as f64 / recent_casts.len() as f64
    };

    // Repeat replier rate: fraction of repliers who replied on 2+ casts
    let mut replier_counts: HashMap<u64, u32> = HashMap::new();
    for cast in &recent_casts {
        if let Some(engagement) = engagement_map.get(&cast.hash) {
            for replier_fid in &engagement.unique_repliers {
                *replier_counts.entry(*replier_fid).or_insert(0) += 1;
            }
        }
    }
    let total_repliers = replier_counts.len();
    let repeat_repliers = replier_counts.values().filter(|&&n| n >= 2).count();
    let repeat_replier_rate = if total_repliers > 0 {
        repeat_repliers as f64 / total_repliers as f64
    } else {
        0.0
    };

    // Reciprocity: fraction of accounts we replied to who also replied back
    let reciprocity_rate = match replied_to_fids {
        Some(replied_to) if !replied_to.is_empty() => {
            let repliers_to_us: HashSet<u64> = recent_casts
                .iter()
                .filter_map(|c| engagement_map.get(&c.hash))
                .flat_map(|e| e.unique_repliers.iter().copied())
                .collect();

            let reciprocated = replied_to
                .iter()
                .filter(|fid| repliers_to_us.contains(fid))
                .count();

            Some(reciprocated as f64 / replied_to.len() as f64)
        }
        _ => None,
    };

    let timestamps: Vec<DateTime<Utc>> = recent_casts.iter().map(|c| c.timestamp).collect();
    let period_start = timestamps.iter().min().copied().unwrap_or(window_start);
    let period_end = timestamps.iter().max().copied().unwrap_or(now);

    UserMetrics {
        fid,
        period_start,
        period_end,
        total_casts: recent_casts.len(),
        median_engagement_score: median(&engagement_scores),
        median_replies_count: median(&replies_counts),
        reply_rate,
        repeat_replier_rate,
        reciprocity_rate,
        // Populated by the clustering stage
        top_themes: Vec::new(),
    }
}

/// Top N casts by engagement score, descending. Ties keep original order.
pub fn top_casts<'a>(
    casts: &'a [Cast],
    metrics_map: &HashMap<String, CastMetrics>,
    n: usize,
) -> Vec<&'a Cast> {
    let mut sorted: Vec<&Cast> = casts.iter().collect();
    sorted.sort_by(|a, b| {
        let score_a = metrics_map.get(&a.hash).map_or(0.0, |m| m.engagement_score);
        let score_b = metrics_map.get(&b.hash).map_or(0.0, |m| m.engagement_score);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(n);
    sorted
}

/// Bottom N casts by engagement score, ascending.
///
/// Casts with zero engagement that are younger than one hour are excluded;
/// they have not had enough time to be judged fairly.
pub fn bottom_casts<'a>(
    casts: &'a [Cast],
    metrics_map: &HashMap<String, CastMetrics>,
    n: usize,
    now: DateTime<Utc>,
) -> Vec<&'a Cast> {
    let one_hour_ago = now - Duration::hours(1);

    let mut eligible: Vec<&Cast> = casts
        .iter()
        .filter(|c| {
            metrics_map.get(&c.hash).is_some_and(|metrics| {
                metrics.engagement_score > 0.0 || c.timestamp < one_hour_ago
            })
        })
        .collect();

    eligible.sort_by(|a, b| {
        let score_a = metrics_map.get(&a.hash).map_or(0.0, |m| m.engagement_score);
        let score_b = metrics_map.get(&b.hash).map_or(0.0, |m| m.engagement_score);
        score_a
            .partial_cmp(&score_b)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    eligible.truncate(n);
    eligible
}

/// Classify a cast into a performance tier by percentile rank within the
/// account's own score distribution.
pub fn categorize_cast_performance(
    cast_hash: &str,
    metrics_map: &HashMap<String, CastMetrics>,
    top_threshold: f64,
    bottom_threshold: f64,
) -> PerformanceRank {
    if metrics_map.is_empty() {
        return PerformanceRank::Middle;
    }

    let score = metrics_map
        .get(cast_hash)
        .map_or(0.0, |m| m.engagement_score);

    let rank = metrics_map
        .values()
        .filter(|m| m.engagement_score < score)
        .count();
    let percentile = rank as f64 / metrics_map.len() as f64;

    if percentile >= 1.0 - top_threshold {
        PerformanceRank::Top
    } else if percentile <= bottom_threshold {
        PerformanceRank::Bottom
    } else {
        PerformanceRank::Middle
    }
}

/// Classification with the default 20% / 20% thresholds
pub fn categorize_cast_performance_default(
    cast_hash: &str,
    metrics_map: &HashMap<String, CastMetrics>,
) -> PerformanceRank {
    categorize_cast_performance(
        cast_hash,
        metrics_map,
        DEFAULT_TOP_THRESHOLD,
        DEFAULT_BOTTOM_THRESHOLD,
    )
}
