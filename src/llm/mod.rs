//! Narrative generation
//!
//! The pipeline talks to the LLM only through the [`NarrativeGenerator`]
//! trait: structured input in, structured text out. The default
//! implementation targets an OpenAI-compatible chat endpoint; tests inject
//! deterministic fakes. Every failure here is soft - the pipeline degrades
//! to fallback labels and briefs instead of aborting.

pub mod client;
pub mod feedback;
pub mod prompts;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

pub use client::parse_json_response;
pub use client::LlmClient;
pub use feedback::fallback_brief;
pub use feedback::generate_batch_cast_feedback;
pub use feedback::generate_weekly_brief;
pub use feedback::label_clusters;
pub use prompts::PromptTemplate;

use crate::config::LlmConfig;
use crate::errors::Result;
use crate::models::{BriefExperiment, BriefInsight, Sentiment};

/// Structured summary of one cast, handed to the generator for feedback
#[derive(Debug, Clone)]
pub struct CastFeedbackInput {
    pub text: String,
    pub engagement_score: f64,
    pub likes_count: u64,
    pub recasts_count: u64,
    pub replies_count: u64,
    pub velocity_score: Option<f64>,
    pub has_question: bool,
    pub has_cta: bool,
    pub cta_words: Vec<String>,
    pub sentiment: Sentiment,
    pub word_count: usize,
    pub has_media: bool,
    pub theme: Option<String>,
    pub is_top_performer: bool,
    pub median_engagement: f64,
}

/// Structured summary of one account, handed to the generator for the brief
#[derive(Debug, Clone)]
pub struct WeeklyBriefInput {
    pub username: String,
    pub total_casts: usize,
    pub median_engagement: f64,
    pub reply_rate: f64,
    pub repeat_replier_rate: f64,
    pub reciprocity_rate: Option<f64>,
    pub top_themes: Vec<String>,
    pub top_performing_theme: Option<String>,
    pub top_performing_theme_engagement: Option<f64>,
    pub question_impact: f64,
    pub cta_impact: f64,
    pub avg_word_count_top: f64,
    pub avg_word_count_bottom: f64,
    pub top_cast_samples: Vec<String>,
    pub bottom_cast_samples: Vec<String>,
}

/// Feedback payload as returned by the generator, before the pipeline
/// attaches the cast hash
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    pub likely_causes: Vec<String>,
    pub what_to_replicate: Vec<String>,
    pub what_to_avoid: Vec<String>,
    pub summary: String,
}

/// Brief payload as returned by the generator
#[derive(Debug, Clone, Deserialize)]
pub struct BriefBody {
    pub win: BriefInsight,
    pub weakness: BriefInsight,
    pub experiment: BriefExperiment,
}

/// Structured-in, structured-out narrative collaborator.
/// Implementations must tolerate zero-item inputs without panicking.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Short (2-4 word) human label for a topic cluster
    async fn label_cluster(&self, sample_texts: &[String], keywords: &[String])
        -> Result<String>;

    /// Coaching feedback for one cast
    async fn cast_feedback(&self, input: &CastFeedbackInput) -> Result<FeedbackBody>;

    /// Weekly win/weakness/experiment brief for the account
    async fn weekly_brief(&self, input: &WeeklyBriefInput) -> Result<BriefBody>;
}

/// Default narrator backed by [`LlmClient`]
pub struct LlmNarrator {
    client: LlmClient,
}

impl LlmNarrator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: LlmClient::new(config)?,
        })
    }
}

fn fmt_percent(value: f64) -> String {
    format!("{:.0}", value * 100.0)
}

fn fmt_signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{value:.0}")
    } else {
        format!("{value:.0}")
    }
}

#[async_trait]
impl NarrativeGenerator for LlmNarrator {
    async fn label_cluster(
        &self,
        sample_texts: &[String],
        keywords: &[String],
    ) -> Result<String> {
        let mut values = HashMap::new();
        values.insert(
            "samples".to_string(),
            prompts::numbered_samples(sample_texts, 150),
        );
        values.insert("keywords".to_string(), keywords.join(", "));

        let prompt = prompts::CoachPrompts::cluster_label().render(&values);
        let label = self
            .client
            .chat(prompts::CLUSTER_LABEL_SYSTEM, &prompt)
            .await?;
        Ok(label.trim().to_string())
    }

    async fn cast_feedback(&self, input: &CastFeedbackInput) -> Result<FeedbackBody> {
        // Median guards against division by zero on dead accounts
        let median = if input.median_engagement > 0.0 {
            input.median_engagement
        } else {
            1.0
        };
        let vs_median = (input.engagement_score / median - 1.0) * 100.0;

        let mut values = HashMap::new();
        values.insert(
            "performance_label".to_string(),
            if input.is_top_performer {
                "TOP PERFORMER".to_string()
            } else {
                "UNDERPERFORMER".to_string()
            },
        );
        values.insert("text".to_string(), input.text.clone());
        values.insert(
            "engagement_score".to_string(),
            format!("{:.1}", input.engagement_score),
        );
        values.insert("vs_median".to_string(), format!("{vs_median:.0}"));
        values.insert("likes".to_string(), input.likes_count.to_string());
        values.insert("recasts".to_string(), input.recasts_count.to_string());
        values.insert("replies".to_string(), input.replies_count.to_string());
        values.insert(
            "velocity".to_string(),
            input.velocity_score.map_or_else(
                || "N/A".to_string(),
                |v| format!("{}% in first 6 hours", fmt_percent(v)),
            ),
        );
        values.insert("has_question".to_string(), input.has_question.to_string());
        values.insert(
            "has_cta".to_string(),
            if input.has_cta {
                format!("true ({})", input.cta_words.join(", "))
            } else {
                "false".to_string()
            },
        );
        values.insert(
            "sentiment".to_string(),
            format!("{:?}", input.sentiment).to_lowercase(),
        );
        values.insert("word_count".to_string(), input.word_count.to_string());
        values.insert("has_media".to_string(), input.has_media.to_string());
        values.insert(
            "theme".to_string(),
            input.theme.clone().unwrap_or_else(|| "Unknown".to_string()),
        );

        let prompt = prompts::CoachPrompts::cast_feedback().render(&values);
        let text = self
            .client
            .chat(prompts::CAST_FEEDBACK_SYSTEM, &prompt)
            .await?;
        parse_json_response(&text)
    }

    async fn weekly_brief(&self, input: &WeeklyBriefInput) -> Result<BriefBody> {
        let mut values = HashMap::new();
        values.insert("username".to_string(), input.username.clone());
        values.insert("total_casts".to_string(), input.total_casts.to_string());
        values.insert(
            "median_engagement".to_string(),
            format!("{:.1}", input.median_engagement),
        );
        values.insert("reply_rate".to_string(), fmt_percent(input.reply_rate));
        values.insert(
            "repeat_replier_rate".to_string(),
            fmt_percent(input.repeat_replier_rate),
        );
        values.insert(
            "reciprocity_line".to_string(),
            input.reciprocity_rate.map_or_else(String::new, |r| {
                format!("- Reciprocity rate: {}%\n", fmt_percent(r))
            }),
        );
        values.insert(
            "top_themes".to_string(),
            if input.top_themes.is_empty() {
                "Mixed topics".to_string()
            } else {
                input.top_themes.join(", ")
            },
        );
        values.insert(
            "top_theme".to_string(),
            input
                .top_performing_theme
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        );
        values.insert(
            "top_theme_engagement".to_string(),
            input
                .top_performing_theme_engagement
                .map_or_else(|| "N/A".to_string(), |e| format!("{e:.1}")),
        );
        values.insert(
            "question_impact".to_string(),
            fmt_signed(input.question_impact),
        );
        values.insert("cta_impact".to_string(), fmt_signed(input.cta_impact));
        values.insert(
            "avg_words_top".to_string(),
            format!("{:.0}", input.avg_word_count_top),
        );
        values.insert(
            "avg_words_bottom".to_string(),
            format!("{:.0}", input.avg_word_count_bottom),
        );
        values.insert(
            "top_samples".to_string(),
            prompts::numbered_samples(&input.top_cast_samples, 100),
        );
        values.insert(
            "bottom_samples".to_string(),
            prompts::numbered_samples(&input.bottom_cast_samples, 100),
        );

        let prompt = prompts::CoachPrompts::weekly_brief().render(&values);
        let text = self
            .client
            .chat(prompts::WEEKLY_BRIEF_SYSTEM, &prompt)
            .await?;
        parse_json_response(&text)
    }
}
