//! Folds typed call outcomes into the facade's status-code results.
//!
//! - A status the server produced is passed through unchanged.
//! - Every client-observed fault becomes [`STATUS_CLIENT_FAILURE`].
//! - Structured results get an empty or zero auxiliary field on failure.
//! - Listings become empty on failure, which makes a failed listing look
//!   exactly like an empty one.

use crate::error::{ChronologError, Result};
use crate::types::{
    AcquireStoryResult, ChronicleAttrResult, ConnectResult, SessionToken, STATUS_CLIENT_FAILURE,
    STATUS_OK,
};

/// Status code for a failed call.
pub fn failure_status(operation: &str, err: &ChronologError) -> i32 {
    match err {
        ChronologError::Server { status } => {
            tracing::debug!("{} rejected by server with status {}", operation, status);
            *status
        }
        other => {
            tracing::warn!("{} failed: {}", operation, other);
            STATUS_CLIENT_FAILURE
        }
    }
}

/// Map a pure status operation.
pub fn status(operation: &str, outcome: Result<()>) -> i32 {
    match outcome {
        Ok(()) => STATUS_OK,
        Err(e) => failure_status(operation, &e),
    }
}

/// Map `connect`.
pub fn connect_result(outcome: Result<SessionToken>) -> ConnectResult {
    match outcome {
        Ok(client_id) => ConnectResult {
            status: STATUS_OK,
            client_id,
        },
        Err(e) => ConnectResult::failure(failure_status("Connect", &e)),
    }
}

/// Map `acquire_story`.
pub fn acquire_result(outcome: Result<String>) -> AcquireStoryResult {
    match outcome {
        Ok(story_id) => AcquireStoryResult {
            status: STATUS_OK,
            story_id,
        },
        Err(e) => AcquireStoryResult::failure(failure_status("AcquireStory", &e)),
    }
}

/// Map `get_chronicle_attr`.
pub fn attr_result(outcome: Result<String>) -> ChronicleAttrResult {
    match outcome {
        Ok(value) => ChronicleAttrResult {
            status: STATUS_OK,
            value,
        },
        Err(e) => ChronicleAttrResult::failure(failure_status("GetChronicleAttr", &e)),
    }
}

/// Map a listing operation.
pub fn sequence(operation: &str, outcome: Result<Vec<String>>) -> Vec<String> {
    outcome.unwrap_or_else(|e| {
        failure_status(operation, &e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> ChronologError {
        ChronologError::Transport("connection closed".into())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status("Disconnect", Ok(())), 0);
        assert_eq!(status("Disconnect", Err(transport())), -1);
        assert_eq!(
            status("Disconnect", Err(ChronologError::Serialization("shape".into()))),
            -1
        );
        assert_eq!(status("Disconnect", Err(ChronologError::Server { status: 17 })), 17);
    }

    #[test]
    fn test_structured_failures_use_safe_defaults() {
        let connect = connect_result(Err(transport()));
        assert_eq!(connect.status, -1);
        assert_eq!(connect.client_id, SessionToken::INVALID);

        let story = acquire_result(Err(ChronologError::Server { status: 2 }));
        assert_eq!(story, AcquireStoryResult::failure(2));

        let attr = attr_result(Err(transport()));
        assert_eq!((attr.status, attr.value.as_str()), (-1, ""));
    }

    #[test]
    fn test_structured_success() {
        assert_eq!(connect_result(Ok(SessionToken(7))).session(), Some(SessionToken(7)));
        assert_eq!(attr_result(Ok("x".into())).value, "x");
        assert_eq!(acquire_result(Ok("story-1".into())).status, 0);
    }

    #[test]
    fn test_failed_listing_is_empty() {
        assert!(sequence("ShowChronicles", Err(transport())).is_empty());
        assert!(sequence("ShowChronicles", Ok(Vec::new())).is_empty());
        assert_eq!(sequence("ShowStories", Ok(vec!["s".into()])), vec!["s".to_string()]);
    }
}
