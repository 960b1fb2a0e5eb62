//! Farcaster data provider boundary
//!
//! The pipeline depends on the network only through [`FarcasterProvider`];
//! the default implementation talks to a Neynar-compatible HTTP API and
//! tests substitute deterministic fakes.

pub mod neynar;

use std::collections::HashMap;

use async_trait::async_trait;

pub use neynar::NeynarProvider;

use crate::errors::Result;
use crate::models::{Cast, CastEngagement, FarcasterUser};

/// Capability set the analysis pipeline needs from the social graph.
///
/// Contract notes the core relies on: cast timestamps are valid instants
/// comparable to now, engagement counts are non-negative, and
/// `get_batch_engagement` may return fewer entries than requested - the
/// caller treats missing entries as zero engagement.
#[async_trait]
pub trait FarcasterProvider: Send + Sync {
    /// Look up a user by fid; `None` when the account does not exist
    async fn get_user_by_fid(&self, fid: u64) -> Result<Option<FarcasterUser>>;

    /// Look up a user by username; `None` when the account does not exist
    async fn get_user_by_username(&self, username: &str) -> Result<Option<FarcasterUser>>;

    /// Recent top-level casts, newest first, up to `limit`
    async fn get_casts_by_fid(&self, fid: u64, limit: u32) -> Result<Vec<Cast>>;

    /// Engagement for a batch of casts, keyed by cast hash. Sparse results
    /// are allowed.
    async fn get_batch_engagement(
        &self,
        cast_hashes: &[String],
    ) -> Result<HashMap<String, CastEngagement>>;

    /// The user's own outbound replies, used to build the replied-to set
    /// for reciprocity
    async fn get_user_replies(&self, fid: u64, limit: u32) -> Result<Vec<Cast>>;
}
