use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Farcaster user profile as returned by the data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarcasterUser {
    pub fid: u64,
    pub username: String,
    pub display_name: String,
    pub pfp_url: Option<String>,
    pub bio: Option<String>,
    pub follower_count: u64,
    pub following_count: u64,
}

/// A single top-level cast published by the analyzed account.
/// Immutable for the lifetime of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cast {
    pub hash: String,
    pub fid: u64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub parent_hash: Option<String>,
    /// Author of the parent cast when this cast is a reply and the provider
    /// can resolve it. Preferred over mentions when building the
    /// replied-to set for reciprocity.
    pub parent_fid: Option<u64>,
    pub embeds: Vec<CastEmbed>,
    /// Fids of mentioned accounts
    pub mentions: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastEmbed {
    pub url: Option<String>,
}

/// Reaction kinds tracked by the engagement model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Recast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub fid: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: ReactionKind,
}

/// A direct reply to a cast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub hash: String,
    pub fid: u64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub parent_hash: String,
}

/// Engagement aggregate attached to one cast, fetched once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastEngagement {
    pub cast_hash: String,
    pub likes_count: u64,
    pub recasts_count: u64,
    pub replies_count: u64,
    pub unique_repliers: Vec<u64>,
    pub reactions: Vec<Reaction>,
    pub replies: Vec<Reply>,
}

impl CastEngagement {
    /// Zero-engagement placeholder for casts the batch fetch missed.
    /// Missing entries degrade to zero counts, they are not an error.
    pub fn empty(cast_hash: impl Into<String>) -> Self {
        Self {
            cast_hash: cast_hash.into(),
            likes_count: 0,
            recasts_count: 0,
            replies_count: 0,
            unique_repliers: Vec::new(),
            reactions: Vec::new(),
            replies: Vec::new(),
        }
    }
}

/// Weights applied to reaction counts when scoring a cast.
/// Replies weigh highest as the strongest intent signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngagementWeights {
    pub reply: f64,
    pub like: f64,
    pub recast: f64,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            reply: 3.0,
            like: 1.0,
            recast: 2.0,
        }
    }
}

/// Derived per-cast metrics, computed once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMetrics {
    pub cast_hash: String,
    /// replies*3 + likes*1 + recasts*2 by default
    pub engagement_score: f64,
    /// Fraction of replies arriving within the early window; None when
    /// there are no replies
    pub velocity_score: Option<f64>,
    /// log2(replies + 1), a damped proxy for thread depth
    pub conversation_depth: f64,
    pub unique_repliers_count: u64,
    pub likes_count: u64,
    pub recasts_count: u64,
    pub replies_count: u64,
}

/// Per-account aggregate over the analysis window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMetrics {
    pub fid: u64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_casts: usize,
    pub median_engagement_score: f64,
    pub median_replies_count: f64,
    /// Fraction of casts with at least one reply
    pub reply_rate: f64,
    /// Fraction of distinct repliers who replied on 2+ casts
    pub repeat_replier_rate: f64,
    /// Fraction of replied-to accounts who replied back; None when no
    /// outbound replies were observed
    pub reciprocity_rate: Option<f64>,
    /// Up to 3 theme labels ranked by average engagement
    pub top_themes: Vec<String>,
}

/// Coarse lexicon-based sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Linguistic and structural signals extracted from one cast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastContentFeatures {
    pub cast_hash: String,
    pub has_question: bool,
    pub has_cta: bool,
    pub cta_words: Vec<String>,
    pub sentiment: Sentiment,
    pub word_count: usize,
    pub has_media: bool,
    pub has_mentions: bool,
    pub has_links: bool,
}

/// Engagement lift of content features versus their complements,
/// computed over the whole corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCorrelation {
    /// Percentage engagement lift for casts containing a question
    pub question_impact: f64,
    pub cta_impact: f64,
    pub media_impact: f64,
    pub avg_word_count_top: f64,
    pub avg_word_count_bottom: f64,
}

/// A group of topically similar casts. Ids are run-scoped; membership is
/// recomputed fresh each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeCluster {
    pub id: usize,
    pub label: String,
    pub description: String,
    pub cast_hashes: Vec<String>,
    pub avg_engagement: f64,
    pub sample_texts: Vec<String>,
}

/// Performance tier relative to the account's own score distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceRank {
    Top,
    Middle,
    Bottom,
}

/// Narrative feedback for one cast. Text is opaque to the core; only the
/// shape is enforced at the parsing boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastFeedback {
    pub cast_hash: String,
    pub likely_causes: Vec<String>,
    pub what_to_replicate: Vec<String>,
    pub what_to_avoid: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefInsight {
    pub title: String,
    pub description: String,
    pub metric: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefExperiment {
    pub title: String,
    pub description: String,
    pub template_cast: String,
    pub rationale: String,
}

/// Weekly summary: one win, one weakness, one suggested experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyBrief {
    pub fid: u64,
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub win: BriefInsight,
    pub weakness: BriefInsight,
    pub experiment: BriefExperiment,
}

/// Everything the pipeline knows about one cast, merged into a single record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastAnalysis {
    pub cast: Cast,
    pub metrics: CastMetrics,
    pub content: CastContentFeatures,
    pub theme: Option<String>,
    pub rank: PerformanceRank,
    pub feedback: Option<CastFeedback>,
}

/// The assembled report. This is the stable boundary consumed by
/// presentation and cache layers; its field set must not change shape
/// between a cache write and a cache read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub user: FarcasterUser,
    pub user_metrics: UserMetrics,
    pub themes: Vec<ThemeCluster>,
    pub top_casts: Vec<CastAnalysis>,
    pub bottom_casts: Vec<CastAnalysis>,
    pub all_casts: Vec<CastAnalysis>,
    pub weekly_brief: WeeklyBrief,
    pub generated_at: DateTime<Utc>,
    /// False when freshly computed; the cache layer flips it on reads
    pub cached: bool,
}
