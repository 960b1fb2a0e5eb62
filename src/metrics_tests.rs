//! Unit tests for the deterministic metrics layer

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};

use crate::analysis::metrics::{
    bottom_casts, categorize_cast_performance_default, compute_cast_metrics,
    compute_user_metrics, conversation_depth, engagement_score, median, top_casts,
    velocity_score, DEFAULT_VELOCITY_WINDOW_HOURS,
};
use crate::models::{Cast, CastEngagement, CastMetrics, EngagementWeights, PerformanceRank};
use crate::tests::{engagement_map, test_cast, test_engagement};

fn metrics_map_for(
    casts: &[Cast],
    engagement: &HashMap<String, CastEngagement>,
) -> HashMap<String, CastMetrics> {
    let weights = EngagementWeights::default();
    casts
        .iter()
        .map(|cast| {
            let e = engagement
                .get(&cast.hash)
                .cloned()
                .unwrap_or_else(|| CastEngagement::empty(cast.hash.clone()));
            (
                cast.hash.clone(),
                compute_cast_metrics(cast, &e, &weights, DEFAULT_VELOCITY_WINDOW_HOURS),
            )
        })
        .collect()
}

#[test]
fn median_of_empty_is_zero() {
    assert_eq!(median(&[]), 0.0);
}

#[test]
fn median_odd_picks_middle() {
    assert_eq!(median(&[9.0, 1.0, 5.0]), 5.0);
}

#[test]
fn median_even_averages_middle_pair() {
    assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
}

#[test]
fn median_single_element() {
    assert_eq!(median(&[7.0]), 7.0);
}

#[test]
fn engagement_score_is_weighted_sum() {
    let cast = test_cast("0xa", 1, "hello world", 2);
    let engagement = test_engagement(&cast, 4, 2, &[(100, 10), (101, 20), (102, 30)]);

    let weights = EngagementWeights::default();
    // 3 replies * 3 + 4 likes * 1 + 2 recasts * 2
    assert_eq!(engagement_score(&engagement, &weights), 17.0);

    let custom = EngagementWeights {
        reply: 1.0,
        like: 0.5,
        recast: 0.0,
    };
    assert_eq!(engagement_score(&engagement, &custom), 5.0);
}

#[test]
fn velocity_is_null_without_replies() {
    let cast = test_cast("0xa", 1, "hello world", 2);
    let engagement = test_engagement(&cast, 50, 10, &[]);
    assert_eq!(velocity_score(&cast, &engagement, 6), None);
}

#[test]
fn velocity_counts_early_reply_fraction() {
    let cast = test_cast("0xa", 1, "hello world", 48);
    // Two replies inside the 6h window, two after
    let engagement = test_engagement(
        &cast,
        0,
        0,
        &[(100, 30), (101, 300), (102, 600), (103, 1200)],
    );

    assert_eq!(velocity_score(&cast, &engagement, 6), Some(0.5));
}

#[test]
fn velocity_is_one_when_all_replies_are_early() {
    let cast = test_cast("0xa", 1, "hello world", 48);
    let engagement = test_engagement(&cast, 0, 0, &[(100, 10), (101, 20)]);
    assert_eq!(velocity_score(&cast, &engagement, 6), Some(1.0));
}

#[test]
fn conversation_depth_is_log2_of_replies_plus_one() {
    let cast = test_cast("0xa", 1, "hello world", 2);

    let none = test_engagement(&cast, 5, 0, &[]);
    assert_eq!(conversation_depth(&none), 0.0);

    let one = test_engagement(&cast, 0, 0, &[(100, 10)]);
    assert!((conversation_depth(&one) - 1.0).abs() < 1e-9);

    let three = test_engagement(&cast, 0, 0, &[(100, 10), (101, 20), (102, 30)]);
    assert!((conversation_depth(&three) - 2.0).abs() < 1e-9);
}

#[test]
fn user_metrics_aggregate_over_window() {
    let now = Utc::now();
    let fid = 1;

    // Four casts, one of them outside the 30-day window
    let casts = vec![
        test_cast("0xa", fid, "first", 24),
        test_cast("0xb", fid, "second", 48),
        test_cast("0xc", fid, "third", 72),
        test_cast("0xd", fid, "ancient", 24 * 45),
    ];

    let engagement = engagement_map(vec![
        test_engagement(&casts[0], 10, 0, &[(100, 10), (101, 20)]),
        test_engagement(&casts[1], 2, 0, &[(100, 10)]),
        test_engagement(&casts[2], 0, 0, &[]),
        test_engagement(&casts[3], 500, 0, &[]),
    ]);
    let metrics = metrics_map_for(&casts, &engagement);

    let user_metrics =
        compute_user_metrics(fid, &casts, &metrics, &engagement, None, 30, now);

    assert_eq!(user_metrics.total_casts, 3);
    // Scores: 16 (10+2*3), 5 (2+3), 0 -> median 5
    assert_eq!(user_metrics.median_engagement_score, 5.0);
    assert_eq!(user_metrics.median_replies_count, 1.0);
    // 2 of 3 casts got a reply
    assert!((user_metrics.reply_rate - 2.0 / 3.0).abs() < 1e-9);
    // Replier 100 hit two casts, replier 101 only one
    assert_eq!(user_metrics.repeat_replier_rate, 0.5);
    assert_eq!(user_metrics.reciprocity_rate, None);
}

#[test]
fn repeat_replier_rate_counts_two_plus_casts() {
    let now = Utc::now();
    let casts = vec![
        test_cast("0xa", 1, "first", 10),
        test_cast("0xb", 1, "second", 20),
        test_cast("0xc", 1, "third", 30),
    ];
    // 100 replies everywhere, 101 on two casts, 102 once
    let engagement = engagement_map(vec![
        test_engagement(&casts[0], 0, 0, &[(100, 10), (101, 15)]),
        test_engagement(&casts[1], 0, 0, &[(100, 10), (101, 15)]),
        test_engagement(&casts[2], 0, 0, &[(100, 10), (102, 15)]),
    ]);
    let metrics = metrics_map_for(&casts, &engagement);

    let user_metrics = compute_user_metrics(1, &casts, &metrics, &engagement, None, 30, now);

    assert!((user_metrics.repeat_replier_rate - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn reciprocity_fraction_of_replied_to_who_replied_back() {
    let now = Utc::now();
    let casts = vec![test_cast("0xa", 1, "first", 10)];
    let engagement = engagement_map(vec![test_engagement(&casts[0], 0, 0, &[(200, 10)])]);
    let metrics = metrics_map_for(&casts, &engagement);

    // We replied to 200 and 201; only 200 replied back
    let replied_to: HashSet<u64> = [200, 201].into_iter().collect();
    let with_set =
        compute_user_metrics(1, &casts, &metrics, &engagement, Some(&replied_to), 30, now);
    assert_eq!(with_set.reciprocity_rate, Some(0.5));

    // Empty replied-to set means the signal was never observed
    let empty = HashSet::new();
    let without =
        compute_user_metrics(1, &casts, &metrics, &engagement, Some(&empty), 30, now);
    assert_eq!(without.reciprocity_rate, None);
}

#[test]
fn top_casts_sorted_descending_and_truncated() {
    let casts = vec![
        test_cast("0xa", 1, "low", 10),
        test_cast("0xb", 1, "high", 20),
        test_cast("0xc", 1, "mid", 30),
    ];
    let engagement = engagement_map(vec![
        test_engagement(&casts[0], 1, 0, &[]),
        test_engagement(&casts[1], 30, 0, &[]),
        test_engagement(&casts[2], 10, 0, &[]),
    ]);
    let metrics = metrics_map_for(&casts, &engagement);

    let top = top_casts(&casts, &metrics, 2);
    let hashes: Vec<&str> = top.iter().map(|c| c.hash.as_str()).collect();
    assert_eq!(hashes, vec!["0xb", "0xc"]);
}

#[test]
fn bottom_casts_exclude_fresh_zero_engagement() {
    let now = Utc::now();
    let mut casts = vec![
        test_cast("0xold-zero", 1, "old and ignored", 5),
        test_cast("0xscored", 1, "some traction", 10),
    ];
    // Posted 10 minutes ago with zero engagement: too young to judge
    let mut fresh = test_cast("0xfresh-zero", 1, "just posted", 0);
    fresh.timestamp = now - Duration::minutes(10);
    casts.push(fresh);

    let engagement = engagement_map(vec![
        test_engagement(&casts[0], 0, 0, &[]),
        test_engagement(&casts[1], 8, 0, &[]),
        test_engagement(&casts[2], 0, 0, &[]),
    ]);
    let metrics = metrics_map_for(&casts, &engagement);

    let bottom = bottom_casts(&casts, &metrics, 5, now);
    let hashes: Vec<&str> = bottom.iter().map(|c| c.hash.as_str()).collect();
    // Ascending by score, fresh zero-engagement cast filtered out
    assert_eq!(hashes, vec!["0xold-zero", "0xscored"]);
}

#[test]
fn bottom_casts_keep_fresh_casts_with_engagement() {
    let now = Utc::now();
    let older = test_cast("0xold", 1, "steady performer", 10);
    // Posted 10 minutes ago but already has a like: old enough to judge
    let mut fresh = test_cast("0xfresh-scored", 1, "just posted, already liked", 0);
    fresh.timestamp = now - Duration::minutes(10);
    let casts = vec![older, fresh];

    let engagement = engagement_map(vec![
        test_engagement(&casts[0], 9, 0, &[]),
        test_engagement(&casts[1], 1, 0, &[]),
    ]);
    let metrics = metrics_map_for(&casts, &engagement);

    let bottom = bottom_casts(&casts, &metrics, 5, now);
    let hashes: Vec<&str> = bottom.iter().map(|c| c.hash.as_str()).collect();
    assert_eq!(hashes, vec!["0xfresh-scored", "0xold"]);
}

#[test]
fn bottom_casts_skip_casts_without_metrics() {
    let now = Utc::now();
    let casts = vec![
        test_cast("0xtracked", 1, "tracked", 10),
        test_cast("0xuntracked", 1, "untracked", 20),
    ];
    let engagement = engagement_map(vec![test_engagement(&casts[0], 3, 0, &[])]);
    // Only the first cast has metrics
    let metrics = metrics_map_for(&casts[..1], &engagement);

    let bottom = bottom_casts(&casts, &metrics, 5, now);
    assert_eq!(bottom.len(), 1);
    assert_eq!(bottom[0].hash, "0xtracked");
}

#[test]
fn percentile_tiers_over_uniform_distribution() {
    // Ten casts with scores 1..=10 via likes
    let casts: Vec<Cast> = (1..=10)
        .map(|i| test_cast(&format!("0x{i:02}"), 1, "text", i * 2))
        .collect();
    let engagement = engagement_map(
        casts
            .iter()
            .enumerate()
            .map(|(i, c)| test_engagement(c, (i + 1) as u64, 0, &[]))
            .collect(),
    );
    let metrics = metrics_map_for(&casts, &engagement);

    let rank_of = |hash: &str| categorize_cast_performance_default(hash, &metrics);

    assert_eq!(rank_of("0x10"), PerformanceRank::Top);
    assert_eq!(rank_of("0x09"), PerformanceRank::Top);
    assert_eq!(rank_of("0x05"), PerformanceRank::Middle);
    assert_eq!(rank_of("0x02"), PerformanceRank::Bottom);
    assert_eq!(rank_of("0x01"), PerformanceRank::Bottom);
}

#[test]
fn percentile_with_empty_distribution_is_middle() {
    let metrics: HashMap<String, CastMetrics> = HashMap::new();
    assert_eq!(
        categorize_cast_performance_default("0xa", &metrics),
        PerformanceRank::Middle
    );
}
