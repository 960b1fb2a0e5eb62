//! Neynar-compatible HTTP provider

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProviderConfig;
use crate::errors::{CastCoachError, Result};
use crate::models::{
    Cast, CastEmbed, CastEngagement, FarcasterUser, Reaction, ReactionKind, Reply,
};

/// Page size cap imposed by the API
const PAGE_LIMIT: u32 = 50;
/// Bulk cast lookup cap imposed by the API
const BULK_BATCH_SIZE: usize = 100;

// ---- Wire types ----

#[derive(Debug, Deserialize)]
struct NeynarUser {
    fid: u64,
    username: String,
    display_name: Option<String>,
    pfp_url: Option<String>,
    profile: Option<NeynarProfile>,
    follower_count: u64,
    following_count: u64,
}

#[derive(Debug, Deserialize)]
struct NeynarProfile {
    bio: Option<NeynarBio>,
}

#[derive(Debug, Deserialize)]
struct NeynarBio {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NeynarEmbed {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NeynarReactions {
    likes_count: u64,
    recasts_count: u64,
    #[serde(default)]
    likes: Vec<NeynarReactor>,
    #[serde(default)]
    recasts: Vec<NeynarReactor>,
}

#[derive(Debug, Deserialize)]
struct NeynarReactor {
    fid: u64,
}

#[derive(Debug, Deserialize)]
struct NeynarReplies {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct NeynarCast {
    hash: String,
    author: NeynarAuthor,
    text: String,
    timestamp: DateTime<Utc>,
    parent_hash: Option<String>,
    parent_author: Option<NeynarParentAuthor>,
    #[serde(default)]
    embeds: Vec<NeynarEmbed>,
    #[serde(default)]
    mentioned_profiles: Vec<NeynarAuthor>,
    reactions: NeynarReactions,
    replies: NeynarReplies,
}

#[derive(Debug, Deserialize)]
struct NeynarAuthor {
    fid: u64,
}

#[derive(Debug, Deserialize)]
struct NeynarParentAuthor {
    fid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct NeynarCastsResponse {
    casts: Vec<NeynarCast>,
    next: Option<NeynarCursor>,
}

#[derive(Debug, Deserialize)]
struct NeynarCursor {
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NeynarUserBulkResponse {
    users: Vec<NeynarUser>,
}

#[derive(Debug, Deserialize)]
struct NeynarUserByNameResponse {
    user: NeynarUser,
}

#[derive(Debug, Deserialize)]
struct NeynarBulkCastsResponse {
    result: NeynarBulkCastsResult,
}

#[derive(Debug, Deserialize)]
struct NeynarBulkCastsResult {
    casts: Vec<NeynarCast>,
}

#[derive(Debug, Deserialize)]
struct NeynarConversationResponse {
    conversation: Option<NeynarConversation>,
}

#[derive(Debug, Deserialize)]
struct NeynarConversation {
    cast: Option<NeynarConversationCast>,
}

#[derive(Debug, Deserialize)]
struct NeynarConversationCast {
    #[serde(default)]
    direct_replies: Vec<NeynarCast>,
}

// ---- Provider ----

/// Data provider backed by a Neynar-compatible API
pub struct NeynarProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NeynarProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            warn!("Provider API key is empty; requests will likely be rejected");
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CastCoachError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let mut url = Url::parse(&format!("{}{endpoint}", self.base_url))
            .map_err(|e| CastCoachError::Provider(format!("invalid URL: {e}")))?;
        for (key, value) in params {
            url.query_pairs_mut().append_pair(key, value);
        }

        debug!("Provider request: {}", url);

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .header("api_key", &self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CastCoachError::Provider("not found".to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CastCoachError::Provider(format!(
                "API error: {status} - {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CastCoachError::Provider(format!("invalid response body: {e}")))
    }

    fn transform_user(user: NeynarUser) -> FarcasterUser {
        FarcasterUser {
            fid: user.fid,
            display_name: user.display_name.unwrap_or_else(|| user.username.clone()),
            username: user.username,
            pfp_url: user.pfp_url,
            bio: user.profile.and_then(|p| p.bio).and_then(|b| b.text),
            follower_count: user.follower_count,
            following_count: user.following_count,
        }
    }

    fn transform_cast(cast: &NeynarCast) -> Cast {
        Cast {
            hash: cast.hash.clone(),
            fid: cast.author.fid,
            text: cast.text.clone(),
            timestamp: cast.timestamp,
            parent_hash: cast.parent_hash.clone(),
            parent_fid: cast.parent_author.as_ref().and_then(|a| a.fid),
            embeds: cast
                .embeds
                .iter()
                .map(|e| CastEmbed { url: e.url.clone() })
                .collect(),
            mentions: cast.mentioned_profiles.iter().map(|p| p.fid).collect(),
        }
    }

    /// Paginated cast feed; `include_replies` switches between top-level
    /// casts and the user's outbound replies.
    async fn fetch_cast_feed(
        &self,
        fid: u64,
        limit: u32,
        include_replies: bool,
    ) -> Result<Vec<Cast>> {
        let mut casts = Vec::new();
        let mut cursor: Option<String> = None;

        while (casts.len() as u32) < limit {
            let page_size = PAGE_LIMIT.min(limit - casts.len() as u32);
            let mut params = vec![
                ("fid", fid.to_string()),
                ("limit", page_size.to_string()),
                ("include_replies", include_replies.to_string()),
            ];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }

            let response: NeynarCastsResponse =
                self.fetch("/farcaster/feed/user/casts", &params).await?;

            let page_empty = response.casts.is_empty();
            for cast in &response.casts {
                if include_replies {
                    // Only actual replies count for the reciprocity set
                    if cast.parent_hash.is_some() {
                        casts.push(Self::transform_cast(cast));
                    }
                } else {
                    casts.push(Self::transform_cast(cast));
                }
            }

            cursor = response.next.and_then(|n| n.cursor);
            if cursor.is_none() || page_empty {
                break;
            }
        }

        Ok(casts)
    }

    /// Direct replies to one cast
    async fn fetch_cast_replies(&self, cast_hash: &str) -> Result<Vec<Reply>> {
        let response: NeynarConversationResponse = self
            .fetch(
                "/farcaster/cast/conversation",
                &[
                    ("identifier", cast_hash.to_string()),
                    ("type", "hash".to_string()),
                    ("reply_depth", "1".to_string()),
                    ("limit", "50".to_string()),
                ],
            )
            .await?;

        let direct_replies = response
            .conversation
            .and_then(|c| c.cast)
            .map(|c| c.direct_replies)
            .unwrap_or_default();

        Ok(direct_replies
            .iter()
            .map(|reply| Reply {
                hash: reply.hash.clone(),
                fid: reply.author.fid,
                text: reply.text.clone(),
                timestamp: reply.timestamp,
                parent_hash: cast_hash.to_string(),
            })
            .collect())
    }

    fn engagement_from_cast(cast: &NeynarCast, replies: Vec<Reply>) -> CastEngagement {
        let mut unique_repliers: Vec<u64> = replies.iter().map(|r| r.fid).collect();
        unique_repliers.sort_unstable();
        unique_repliers.dedup();

        let reactions = cast
            .reactions
            .likes
            .iter()
            .map(|l| (l.fid, ReactionKind::Like))
            .chain(
                cast.reactions
                    .recasts
                    .iter()
                    .map(|r| (r.fid, ReactionKind::Recast)),
            )
            // Reaction timestamps are not exposed by the API
            .map(|(fid, kind)| Reaction {
                fid,
                timestamp: Utc::now(),
                kind,
            })
            .collect();

        CastEngagement {
            cast_hash: cast.hash.clone(),
            likes_count: cast.reactions.likes_count,
            recasts_count: cast.reactions.recasts_count,
            replies_count: cast.replies.count,
            unique_repliers,
            reactions,
            replies,
        }
    }
}

#[async_trait]
impl crate::farcaster::FarcasterProvider for NeynarProvider {
    async fn get_user_by_fid(&self, fid: u64) -> Result<Option<FarcasterUser>> {
        let response: NeynarUserBulkResponse = match self
            .fetch("/farcaster/user/bulk", &[("fids", fid.to_string())])
            .await
        {
            Ok(r) => r,
            Err(CastCoachError::Provider(msg)) if msg == "not found" => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(response.users.into_iter().next().map(Self::transform_user))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<FarcasterUser>> {
        let response: NeynarUserByNameResponse = match self
            .fetch(
                "/farcaster/user/by_username",
                &[("username", username.to_string())],
            )
            .await
        {
            Ok(r) => r,
            Err(CastCoachError::Provider(msg)) if msg == "not found" => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(Self::transform_user(response.user)))
    }

    async fn get_casts_by_fid(&self, fid: u64, limit: u32) -> Result<Vec<Cast>> {
        self.fetch_cast_feed(fid, limit, false).await
    }

    async fn get_batch_engagement(
        &self,
        cast_hashes: &[String],
    ) -> Result<HashMap<String, CastEngagement>> {
        let mut results = HashMap::new();

        for batch in cast_hashes.chunks(BULK_BATCH_SIZE) {
            let response: NeynarBulkCastsResponse = self
                .fetch("/farcaster/casts", &[("casts", batch.join(","))])
                .await?;

            for cast in &response.result.casts {
                // Reply detail needs a per-cast conversation fetch; tolerate
                // partial failure with counts-only engagement
                let replies = match self.fetch_cast_replies(&cast.hash).await {
                    Ok(replies) => replies,
                    Err(e) => {
                        warn!("Reply fetch failed for cast {}: {}", cast.hash, e);
                        Vec::new()
                    }
                };
                results.insert(cast.hash.clone(), Self::engagement_from_cast(cast, replies));
            }
        }

        Ok(results)
    }

    async fn get_user_replies(&self, fid: u64, limit: u32) -> Result<Vec<Cast>> {
        self.fetch_cast_feed(fid, limit, true).await
    }
}
