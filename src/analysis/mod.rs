//! Influence analysis for a single Farcaster account
//!
//! This module contains the whole analysis core:
//! - Deterministic engagement and velocity metrics
//! - Content feature extraction (questions, CTAs, sentiment, media)
//! - TF-IDF + k-means topic clustering
//! - Ranking and percentile classification
//! - The pipeline orchestrating all stages into a single report
//!
//! # Examples
//!
//! ```rust,no_run
//! use castcoach::analysis::{AnalysisService, AnalysisTarget};
//! use castcoach::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = AnalysisService::new(&config)?;
//!
//!     let report = service
//!         .run(AnalysisTarget::Username("dwr".to_string()), None)
//!         .await?;
//!     println!("Median engagement: {}", report.user_metrics.median_engagement_score);
//!     println!("Themes: {}", report.themes.len());
//!
//!     Ok(())
//! }
//! ```

pub mod clustering;
pub mod content;
pub mod metrics;
pub mod pipeline;

pub use clustering::cluster_casts;
pub use clustering::top_theme;
pub use content::analyze_feature_correlation;
pub use content::extract_batch_content_features;
pub use content::extract_content_features;
pub use metrics::compute_cast_metrics;
pub use metrics::compute_user_metrics;
pub use metrics::median;
pub use pipeline::AnalysisService;
pub use pipeline::AnalysisTarget;
pub use pipeline::ProgressCallback;
