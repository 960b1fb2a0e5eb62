//! Complete analysis pipeline: fetch -> score -> cluster -> narrate
//!
//! Ten strictly sequential stages, each announced through the progress
//! callback before it executes. The only fatal checkpoints are a missing
//! profile and an empty corpus; every narrative failure after that point
//! degrades and the run still reaches the final assembly stage.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::analysis::clustering::cluster_casts;
use crate::analysis::content::{analyze_feature_correlation, extract_batch_content_features};
use crate::analysis::metrics::{
    bottom_casts, categorize_cast_performance_default, compute_cast_metrics,
    compute_user_metrics, top_casts,
};
use crate::config::{AnalysisConfig, AppConfig};
use crate::errors::{CastCoachError, Result};
use crate::farcaster::{FarcasterProvider, NeynarProvider};
use crate::llm::{
    generate_batch_cast_feedback, generate_weekly_brief, label_clusters, LlmNarrator,
    NarrativeGenerator,
};
use crate::models::{
    AnalysisResult, Cast, CastAnalysis, CastEngagement, CastMetrics, EngagementWeights,
};

/// Cap on outbound replies fetched for the reciprocity set
const REPLY_FETCH_LIMIT: u32 = 100;

/// Account to analyze, by fid or username
#[derive(Debug, Clone)]
pub enum AnalysisTarget {
    Fid(u64),
    Username(String),
}

impl std::fmt::Display for AnalysisTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fid(fid) => write!(f, "fid {fid}"),
            Self::Username(name) => write!(f, "@{name}"),
        }
    }
}

/// Stage-boundary progress observer: (stage name, percent complete).
/// Invoked synchronously, exactly once per stage, in order.
pub type ProgressCallback<'a> = &'a (dyn Fn(&str, u8) + Send + Sync);

/// The analysis orchestrator. Owns the lifecycle of all derived entities
/// for a run; nothing survives beyond the returned report.
pub struct AnalysisService {
    provider: Arc<dyn FarcasterProvider>,
    narrator: Arc<dyn NarrativeGenerator>,
    config: AnalysisConfig,
}

impl AnalysisService {
    /// Create a service with the default HTTP provider and LLM narrator
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = Arc::new(NeynarProvider::new(&config.provider)?);
        let narrator = Arc::new(LlmNarrator::new(&config.llm)?);
        Ok(Self::from_services(
            provider,
            narrator,
            config.analysis.clone(),
        ))
    }

    /// Create from existing collaborators, e.g. test doubles
    #[must_use]
    pub fn from_services(
        provider: Arc<dyn FarcasterProvider>,
        narrator: Arc<dyn NarrativeGenerator>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            provider,
            narrator,
            config,
        }
    }

    /// Run the full analysis pipeline for one account.
    ///
    /// # Errors
    /// - `UserNotFound` when the target does not exist upstream
    /// - `EmptyCorpus` when no casts exist within the lookback window
    /// - Provider errors from the two fetch stages
    pub async fn run(
        &self,
        target: AnalysisTarget,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<AnalysisResult> {
        let report = |stage: &str, percent: u8| {
            if let Some(callback) = on_progress {
                callback(stage, percent);
            }
        };
        let now = Utc::now();
        let weights = EngagementWeights {
            reply: self.config.reply_weight,
            like: self.config.like_weight,
            recast: self.config.recast_weight,
        };

        info!("Starting analysis for {}", target);

        // Stage 1: fetch user profile
        report("Fetching user profile...", 10);
        let user = match &target {
            AnalysisTarget::Fid(fid) => self.provider.get_user_by_fid(*fid).await?,
            AnalysisTarget::Username(name) => {
                self.provider.get_user_by_username(name).await?
            }
        }
        .ok_or_else(|| CastCoachError::UserNotFound(target.to_string()))?;

        // Stage 2: fetch recent casts
        report("Fetching recent casts...", 20);
        let casts = self
            .provider
            .get_casts_by_fid(user.fid, self.config.max_casts)
            .await?;
        if casts.is_empty() {
            return Err(CastCoachError::EmptyCorpus(self.config.days_back));
        }

        let cutoff = now - Duration::days(i64::from(self.config.days_back));
        let recent_casts: Vec<Cast> = casts
            .into_iter()
            .filter(|c| c.timestamp >= cutoff)
            .collect();
        if recent_casts.is_empty() {
            return Err(CastCoachError::EmptyCorpus(self.config.days_back));
        }
        debug!("{} casts within the {}-day window", recent_casts.len(), self.config.days_back);

        // Stage 3: fetch engagement and compute per-cast metrics
        report("Computing engagement metrics...", 35);
        let hashes: Vec<String> = recent_casts.iter().map(|c| c.hash.clone()).collect();
        let mut engagement_map = self.provider.get_batch_engagement(&hashes).await?;
        for hash in &hashes {
            // Sparse batch results degrade to zero engagement
            engagement_map
                .entry(hash.clone())
                .or_insert_with(|| CastEngagement::empty(hash.clone()));
        }

        let metrics_map: HashMap<String, CastMetrics> = recent_casts
            .iter()
            .map(|cast| {
                let engagement = &engagement_map[&cast.hash];
                (
                    cast.hash.clone(),
                    compute_cast_metrics(
                        cast,
                        engagement,
                        &weights,
                        self.config.velocity_window_hours,
                    ),
                )
            })
            .collect();

        // Stage 4: extract content features
        report("Analyzing content features...", 50);
        let content_map = extract_batch_content_features(&recent_casts);

        // Stage 5: cluster by topic and label the clusters
        report("Identifying themes...", 60);
        let (clusters, cast_to_cluster) =
            cluster_casts(&recent_casts, &metrics_map, self.config.cluster_count);
        let labeled_clusters = label_clusters(Arc::clone(&self.narrator), clusters).await;

        let cast_to_theme: HashMap<String, String> = cast_to_cluster
            .iter()
            .filter_map(|(hash, cluster_id)| {
                labeled_clusters
                    .iter()
                    .find(|c| c.id == *cluster_id)
                    .map(|c| (hash.clone(), c.label.clone()))
            })
            .collect();

        // Stage 6: compute account-level metrics
        report("Computing user metrics...", 70);
        let replied_to_fids = self.fetch_replied_to_fids(user.fid).await;
        let mut user_metrics = compute_user_metrics(
            user.fid,
            &recent_casts,
            &metrics_map,
            &engagement_map,
            replied_to_fids.as_ref(),
            self.config.days_back,
            now,
        );
        user_metrics.top_themes = labeled_clusters
            .iter()
            .take(3)
            .map(|c| c.label.clone())
            .collect();

        // Stage 7: select top and bottom performers
        report("Identifying top and bottom posts...", 80);
        let top = top_casts(&recent_casts, &metrics_map, self.config.top_n);
        let bottom = bottom_casts(&recent_casts, &metrics_map, self.config.bottom_n, now);
        let top_hashes: HashSet<String> = top.iter().map(|c| c.hash.clone()).collect();

        // Stage 8: generate per-cast feedback for the selected performers
        report("Generating personalized feedback...", 85);
        let feedback_casts: Vec<&Cast> = top.iter().chain(bottom.iter()).copied().collect();
        let feedback_map = generate_batch_cast_feedback(
            Arc::clone(&self.narrator),
            &feedback_casts,
            &metrics_map,
            &content_map,
            &cast_to_theme,
            &top_hashes,
            user_metrics.median_engagement_score,
        )
        .await;

        // Stage 9: generate the weekly brief
        report("Creating weekly brief...", 95);
        let engagement_scores: HashMap<String, f64> = metrics_map
            .iter()
            .map(|(hash, m)| (hash.clone(), m.engagement_score))
            .collect();
        let correlation = analyze_feature_correlation(&content_map, &engagement_scores);

        let weekly_brief = generate_weekly_brief(
            Arc::clone(&self.narrator),
            user.fid,
            &user.username,
            &user_metrics,
            &labeled_clusters,
            &top,
            &bottom,
            &correlation,
        )
        .await;

        // Stage 10: assemble the final report
        report("Finalizing analysis...", 100);
        let build_analysis = |cast: &Cast| -> CastAnalysis {
            CastAnalysis {
                cast: cast.clone(),
                metrics: metrics_map[&cast.hash].clone(),
                content: content_map[&cast.hash].clone(),
                theme: cast_to_theme.get(&cast.hash).cloned(),
                rank: categorize_cast_performance_default(&cast.hash, &metrics_map),
                feedback: feedback_map.get(&cast.hash).cloned(),
            }
        };

        let top_analyses = top.iter().map(|c| build_analysis(c)).collect();
        let bottom_analyses = bottom.iter().map(|c| build_analysis(c)).collect();
        let all_analyses: Vec<CastAnalysis> = recent_casts.iter().map(build_analysis).collect();

        info!(
            "Analysis complete for {}: {} casts, {} themes",
            target,
            all_analyses.len(),
            labeled_clusters.len()
        );

        Ok(AnalysisResult {
            user,
            user_metrics,
            themes: labeled_clusters,
            top_casts: top_analyses,
            bottom_casts: bottom_analyses,
            all_casts: all_analyses,
            weekly_brief,
            generated_at: now,
            cached: false,
        })
    }

    /// Accounts the user replied to, for reciprocity. Prefers the true
    /// parent-cast author; falls back to mentions for providers that
    /// cannot resolve parents. None when nothing could be fetched.
    async fn fetch_replied_to_fids(&self, fid: u64) -> Option<HashSet<u64>> {
        let replies = match self.provider.get_user_replies(fid, REPLY_FETCH_LIMIT).await {
            Ok(replies) => replies,
            Err(e) => {
                // Reciprocity is optional; a failed fetch just leaves it null
                debug!("Outbound reply fetch failed: {}", e);
                return None;
            }
        };

        let mut replied_to = HashSet::new();
        for reply in &replies {
            if let Some(parent_fid) = reply.parent_fid {
                replied_to.insert(parent_fid);
            } else {
                replied_to.extend(reply.mentions.iter().copied());
            }
        }
        // Never count replying to yourself
        replied_to.remove(&fid);

        if replied_to.is_empty() {
            None
        } else {
            Some(replied_to)
        }
    }
}
