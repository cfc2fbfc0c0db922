// Request handling behind the socket: turn a ClientMessage into a reply.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use smashspot_core::config::Config;
use smashspot_core::feed::{build_feed, FeedRequest};
use smashspot_core::snapshot::{DisplayMetadata, SnapshotSource};

use crate::protocol::{resolve_limit, ClientMessage, ServerMessage};

/// Anything that can answer client requests. The socket layer only knows
/// this trait, so tests can drive it with a canned handler.
#[async_trait]
pub trait FeedHandler: Send + Sync {
    async fn handle(&self, request: ClientMessage) -> ServerMessage;
}

/// Serves `feed` requests from a snapshot source. Scoring is CPU-bound and
/// the store is synchronous, so each request runs on the blocking pool.
pub struct FeedService<S> {
    source: Arc<S>,
    config: Arc<Config>,
}

impl<S> FeedService<S>
where
    S: SnapshotSource + DisplayMetadata + Send + Sync + 'static,
{
    pub fn new(source: Arc<S>, config: Arc<Config>) -> Self {
        Self { source, config }
    }

    async fn feed(&self, season: i32, week: u32, limit: Option<usize>) -> ServerMessage {
        let limit = match resolve_limit(limit, &self.config.feed) {
            Ok(limit) => limit,
            Err(e) => return ServerMessage::error(e.to_string()),
        };
        let request = FeedRequest {
            season,
            week,
            limit,
            as_of: Utc::now(),
        };

        let source = Arc::clone(&self.source);
        let config = Arc::clone(&self.config);
        let result =
            tokio::task::spawn_blocking(move || build_feed(source.as_ref(), &config, &request)).await;

        match result {
            Ok(Ok(entries)) => {
                info!(season, week, limit, returned = entries.len(), "served feed");
                ServerMessage::Feed {
                    season,
                    week,
                    entries,
                }
            }
            Ok(Err(e)) => {
                warn!("feed request for season {season} week {week} failed: {e:#}");
                ServerMessage::error(format!("{e:#}"))
            }
            Err(e) => {
                warn!("feed task for season {season} week {week} did not complete: {e}");
                ServerMessage::error("feed computation failed")
            }
        }
    }
}

#[async_trait]
impl<S> FeedHandler for FeedService<S>
where
    S: SnapshotSource + DisplayMetadata + Send + Sync + 'static,
{
    async fn handle(&self, request: ClientMessage) -> ServerMessage {
        match request {
            ClientMessage::Feed {
                season,
                week,
                limit,
            } => self.feed(season, week, limit).await,
        }
    }
}
