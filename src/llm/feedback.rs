//! Feedback, brief, and cluster-label generation on top of
//! [`NarrativeGenerator`]
//!
//! All three degrade rather than fail: a cast without feedback stays
//! feedback-less, an unlabeled cluster keeps its keyword label, and a
//! failed brief is synthesized deterministically from local metrics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::analysis::clustering::{ALL_POSTS_LABEL, MIXED_TOPICS_LABEL};
use crate::models::{
    BriefExperiment, BriefInsight, Cast, CastContentFeatures, CastFeedback, CastMetrics,
    FeatureCorrelation, ThemeCluster, UserMetrics, WeeklyBrief,
};

use super::{CastFeedbackInput, NarrativeGenerator, WeeklyBriefInput};

/// Bounded fan-out for per-cast feedback calls
const FEEDBACK_CONCURRENCY: usize = 3;

fn build_feedback_input(
    cast: &Cast,
    metrics: &CastMetrics,
    content: &CastContentFeatures,
    theme: Option<&String>,
    is_top_performer: bool,
    median_engagement: f64,
) -> CastFeedbackInput {
    CastFeedbackInput {
        text: cast.text.clone(),
        engagement_score: metrics.engagement_score,
        likes_count: metrics.likes_count,
        recasts_count: metrics.recasts_count,
        replies_count: metrics.replies_count,
        velocity_score: metrics.velocity_score,
        has_question: content.has_question,
        has_cta: content.has_cta,
        cta_words: content.cta_words.clone(),
        sentiment: content.sentiment,
        word_count: content.word_count,
        has_media: content.has_media,
        theme: theme.cloned(),
        is_top_performer,
        median_engagement,
    }
}

/// Generate feedback for a batch of casts with bounded concurrency.
///
/// Results are merged keyed by cast hash; a failed call drops only that
/// cast's feedback and leaves the rest of the batch intact.
pub async fn generate_batch_cast_feedback(
    narrator: Arc<dyn NarrativeGenerator>,
    casts: &[&Cast],
    metrics_map: &HashMap<String, CastMetrics>,
    content_map: &HashMap<String, CastContentFeatures>,
    cast_to_theme: &HashMap<String, String>,
    top_hashes: &HashSet<String>,
    median_engagement: f64,
) -> HashMap<String, CastFeedback> {
    let inputs: Vec<(String, CastFeedbackInput)> = casts
        .iter()
        .filter_map(|cast| {
            let metrics = metrics_map.get(&cast.hash)?;
            let content = content_map.get(&cast.hash)?;
            let input = build_feedback_input(
                cast,
                metrics,
                content,
                cast_to_theme.get(&cast.hash),
                top_hashes.contains(&cast.hash),
                median_engagement,
            );
            Some((cast.hash.clone(), input))
        })
        .collect();

    let results: Vec<(String, crate::Result<super::FeedbackBody>)> = stream::iter(inputs)
        .map(|(hash, input)| {
            let narrator = Arc::clone(&narrator);
            async move {
                let result = narrator.cast_feedback(&input).await;
                (hash, result)
            }
        })
        .buffer_unordered(FEEDBACK_CONCURRENCY)
        .collect()
        .await;

    let mut feedback_map = HashMap::new();
    for (hash, result) in results {
        match result {
            Ok(body) => {
                feedback_map.insert(
                    hash.clone(),
                    CastFeedback {
                        cast_hash: hash,
                        likely_causes: body.likely_causes,
                        what_to_replicate: body.what_to_replicate,
                        what_to_avoid: body.what_to_avoid,
                        summary: body.summary,
                    },
                );
            }
            Err(e) => {
                warn!("Feedback generation failed for cast {}: {}", hash, e);
            }
        }
    }

    feedback_map
}

/// Replace provisional keyword labels with human labels from the narrator.
/// A failed call keeps the TF-IDF-derived label. Catch-all fallback
/// clusters keep their reserved label so a degenerate corpus stays visible
/// in the final report.
pub async fn label_clusters(
    narrator: Arc<dyn NarrativeGenerator>,
    clusters: Vec<ThemeCluster>,
) -> Vec<ThemeCluster> {
    let mut labeled = Vec::with_capacity(clusters.len());

    for mut cluster in clusters {
        if cluster.label == ALL_POSTS_LABEL || cluster.label == MIXED_TOPICS_LABEL {
            labeled.push(cluster);
            continue;
        }
        let keywords: Vec<String> = cluster
            .label
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        match narrator
            .label_cluster(&cluster.sample_texts, &keywords)
            .await
        {
            Ok(label) if !label.is_empty() => cluster.label = label,
            Ok(_) => {}
            Err(e) => {
                warn!("Cluster labeling failed for cluster {}: {}", cluster.id, e);
            }
        }
        labeled.push(cluster);
    }

    labeled
}

/// Deterministic brief used when the narrator fails: every field derives
/// from local metrics alone.
pub fn fallback_brief(fid: u64, user_metrics: &UserMetrics) -> WeeklyBrief {
    WeeklyBrief {
        fid,
        generated_at: Utc::now(),
        period_start: user_metrics.period_start,
        period_end: user_metrics.period_end,
        win: BriefInsight {
            title: "Keep Posting".to_string(),
            description: format!(
                "You posted {} times this period.",
                user_metrics.total_casts
            ),
            metric: "Total Posts".to_string(),
            value: user_metrics.total_casts.to_string(),
        },
        weakness: BriefInsight {
            title: "Engagement Opportunity".to_string(),
            description: "Focus on posts that spark conversations.".to_string(),
            metric: "Reply Rate".to_string(),
            value: format!("{:.0}%", user_metrics.reply_rate * 100.0),
        },
        experiment: BriefExperiment {
            title: "Ask Questions".to_string(),
            description: "Try ending your next few posts with genuine questions.".to_string(),
            template_cast: "What's something you learned this week that changed how you think?"
                .to_string(),
            rationale: "Questions invite responses and boost reply rates.".to_string(),
        },
    }
}

/// Generate the weekly brief, falling back to a deterministic one on any
/// narrator failure.
pub async fn generate_weekly_brief(
    narrator: Arc<dyn NarrativeGenerator>,
    fid: u64,
    username: &str,
    user_metrics: &UserMetrics,
    themes: &[ThemeCluster],
    top_casts: &[&Cast],
    bottom_casts: &[&Cast],
    correlation: &FeatureCorrelation,
) -> WeeklyBrief {
    let top_theme = themes.iter().max_by(|a, b| {
        a.avg_engagement
            .partial_cmp(&b.avg_engagement)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let input = WeeklyBriefInput {
        username: username.to_string(),
        total_casts: user_metrics.total_casts,
        median_engagement: user_metrics.median_engagement_score,
        reply_rate: user_metrics.reply_rate,
        repeat_replier_rate: user_metrics.repeat_replier_rate,
        reciprocity_rate: user_metrics.reciprocity_rate,
        top_themes: themes.iter().map(|t| t.label.clone()).take(5).collect(),
        top_performing_theme: top_theme.map(|t| t.label.clone()),
        top_performing_theme_engagement: top_theme.map(|t| t.avg_engagement),
        question_impact: correlation.question_impact,
        cta_impact: correlation.cta_impact,
        avg_word_count_top: correlation.avg_word_count_top,
        avg_word_count_bottom: correlation.avg_word_count_bottom,
        top_cast_samples: top_casts.iter().map(|c| c.text.clone()).collect(),
        bottom_cast_samples: bottom_casts.iter().map(|c| c.text.clone()).collect(),
    };

    match narrator.weekly_brief(&input).await {
        Ok(body) => WeeklyBrief {
            fid,
            generated_at: Utc::now(),
            period_start: user_metrics.period_start,
            period_end: user_metrics.period_end,
            win: body.win,
            weakness: body.weakness,
            experiment: body.experiment,
        },
        Err(e) => {
            warn!("Weekly brief generation failed, using fallback: {}", e);
            fallback_brief(fid, user_metrics)
        }
    }
}
