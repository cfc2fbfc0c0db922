// JSON frames exchanged with feed clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use smashspot_core::config::FeedConfig;
use smashspot_core::feed::FeedEntry;

/// Requests a client may send. One text frame carries one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Feed {
        season: i32,
        week: u32,
        #[serde(default)]
        limit: Option<usize>,
    },
}

/// Replies sent back on the same connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Feed {
        season: i32,
        week: u32,
        entries: Vec<FeedEntry>,
    },
    Error {
        message: String,
    },
}

/// Why a request could not be served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("limit must be at least 1")]
    ZeroLimit,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Serialize to a text frame payload.
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("failed to serialize reply: {e}");
                r#"{"type":"error","message":"internal serialization failure"}"#.to_string()
            }
        }
    }
}

pub fn parse_client_message(text: &str) -> Result<ClientMessage, RequestError> {
    serde_json::from_str(text).map_err(|e| RequestError::Malformed(e.to_string()))
}

/// Resolve a requested limit: omitted uses the configured default, zero is
/// rejected, anything above the configured maximum is clamped to it.
pub fn resolve_limit(requested: Option<usize>, feed: &FeedConfig) -> Result<usize, RequestError> {
    match requested {
        None => Ok(feed.default_limit.min(feed.max_limit)),
        Some(0) => Err(RequestError::ZeroLimit),
        Some(n) => Ok(n.min(feed.max_limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_config() -> FeedConfig {
        FeedConfig {
            default_limit: 25,
            max_limit: 200,
            flags_per_player: 3,
        }
    }

    #[test]
    fn parses_feed_request_with_limit() {
        let msg = parse_client_message(r#"{"type":"feed","season":2025,"week":7,"limit":10}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Feed {
                season: 2025,
                week: 7,
                limit: Some(10)
            }
        );
    }

    #[test]
    fn limit_is_optional() {
        let msg = parse_client_message(r#"{"type":"feed","season":2025,"week":7}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Feed {
                season: 2025,
                week: 7,
                limit: None
            }
        );
    }

    #[test]
    fn unknown_type_is_malformed() {
        let err = parse_client_message(r#"{"type":"standings","season":2025}"#).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn negative_week_is_malformed() {
        let err = parse_client_message(r#"{"type":"feed","season":2025,"week":-1}"#).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn limit_resolution() {
        let cfg = feed_config();
        assert_eq!(resolve_limit(None, &cfg), Ok(25));
        assert_eq!(resolve_limit(Some(5), &cfg), Ok(5));
        assert_eq!(resolve_limit(Some(5000), &cfg), Ok(200));
        assert_eq!(resolve_limit(Some(0), &cfg), Err(RequestError::ZeroLimit));
    }

    #[test]
    fn error_frame_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&ServerMessage::error("bad things").to_json()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "bad things");
    }

    #[test]
    fn empty_feed_frame_has_empty_entries() {
        let reply = ServerMessage::Feed {
            season: 2025,
            week: 7,
            entries: vec![],
        };
        let json: serde_json::Value = serde_json::from_str(&reply.to_json()).unwrap();
        assert_eq!(json["type"], "feed");
        assert_eq!(json["week"], 7);
        assert_eq!(json["entries"], serde_json::json!([]));
    }
}
