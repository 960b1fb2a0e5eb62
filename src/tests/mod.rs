//! Shared fixtures for integration-style tests.
//!
//! Builders here produce casts and engagement records with controlled
//! timestamps so metric assertions stay deterministic.


use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::llm::fallback_brief;
use crate::models::{
    AnalysisResult, Cast, CastEngagement, FarcasterUser, Reaction, ReactionKind, Reply,
    UserMetrics,
};

pub fn test_user(fid: u64, username: &str) -> FarcasterUser {
    FarcasterUser {
        fid,
        username: username.to_string(),
        display_name: username.to_string(),
        pfp_url: None,
        bio: Some("building things".to_string()),
        follower_count: 1200,
        following_count: 340,
    }
}

/// Cast posted `hours_ago` hours before now
pub fn test_cast(hash: &str, fid: u64, text: &str, hours_ago: i64) -> Cast {
    test_cast_at(hash, fid, text, Utc::now() - Duration::hours(hours_ago))
}

pub fn test_cast_at(hash: &str, fid: u64, text: &str, timestamp: DateTime<Utc>) -> Cast {
    Cast {
        hash: hash.to_string(),
        fid,
        text: text.to_string(),
        timestamp,
        parent_hash: None,
        parent_fid: None,
        embeds: Vec::new(),
        mentions: Vec::new(),
    }
}

/// Engagement for a cast where each `(fid, minutes_after)` pair is one
/// reply arriving that many minutes after publication
pub fn test_engagement(
    cast: &Cast,
    likes: u64,
    recasts: u64,
    replies: &[(u64, i64)],
) -> CastEngagement {
    let reactions: Vec<Reaction> = (0..likes)
        .map(|i| Reaction {
            fid: 10_000 + i,
            kind: ReactionKind::Like,
            timestamp: cast.timestamp + Duration::minutes(5),
        })
        .chain((0..recasts).map(|i| Reaction {
            fid: 20_000 + i,
            kind: ReactionKind::Recast,
            timestamp: cast.timestamp + Duration::minutes(10),
        }))
        .collect();

    let replies: Vec<Reply> = replies
        .iter()
        .enumerate()
        .map(|(i, (fid, minutes_after))| Reply {
            hash: format!("{}-reply-{i}", cast.hash),
            fid: *fid,
            text: "nice one".to_string(),
            timestamp: cast.timestamp + Duration::minutes(*minutes_after),
            parent_hash: cast.hash.clone(),
        })
        .collect();

    let mut unique_repliers: Vec<u64> = replies.iter().map(|r| r.fid).collect();
    unique_repliers.sort_unstable();
    unique_repliers.dedup();

    CastEngagement {
        cast_hash: cast.hash.clone(),
        likes_count: likes,
        recasts_count: recasts,
        replies_count: replies.len() as u64,
        unique_repliers,
        reactions,
        replies,
    }
}

/// Engagement entries keyed by cast hash, the shape the metric helpers eat
pub fn engagement_map(entries: Vec<CastEngagement>) -> HashMap<String, CastEngagement> {
    entries
        .into_iter()
        .map(|e| (e.cast_hash.clone(), e))
        .collect()
}

/// Minimal assembled report, enough for cache round trips
pub fn sample_result(fid: u64) -> AnalysisResult {
    let now = Utc::now();
    let user_metrics = UserMetrics {
        fid,
        period_start: now - Duration::days(30),
        period_end: now,
        total_casts: 3,
        median_engagement_score: 12.0,
        median_replies_count: 1.0,
        reply_rate: 0.5,
        repeat_replier_rate: 0.0,
        reciprocity_rate: None,
        top_themes: Vec::new(),
    };
    let weekly_brief = fallback_brief(fid, &user_metrics);

    AnalysisResult {
        user: test_user(fid, "alice"),
        user_metrics,
        themes: Vec::new(),
        top_casts: Vec::new(),
        bottom_casts: Vec::new(),
        all_casts: Vec::new(),
        weekly_brief,
        generated_at: now,
        cached: false,
    }
}
