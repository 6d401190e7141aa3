//! Value types shared by the facade and the typed API.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Status returned by the server on success.
pub const STATUS_OK: i32 = 0;

/// Status the facade reports when a call failed on the client side.
pub const STATUS_CLIENT_FAILURE: i32 = -1;

/// Key/value attributes attached to chronicles and stories.
pub type Attributes = HashMap<String, String>;

/// Opaque session token issued by `Connect`.
///
/// The server owns the session; the client only carries the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub u32);

impl SessionToken {
    /// Reserved value that never identifies a live session.
    pub const INVALID: SessionToken = SessionToken(0);

    /// True unless this is [`SessionToken::INVALID`].
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Raw token value.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for SessionToken {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResult {
    pub status: i32,
    pub client_id: SessionToken,
}

impl ConnectResult {
    /// Failure-shaped result with a zero token.
    pub fn failure(status: i32) -> Self {
        Self {
            status,
            client_id: SessionToken::INVALID,
        }
    }

    /// The session token, only if the call succeeded and issued a usable one.
    pub fn session(&self) -> Option<SessionToken> {
        (self.status == STATUS_OK && self.client_id.is_valid()).then_some(self.client_id)
    }
}

/// Outcome of `acquire_story`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireStoryResult {
    pub status: i32,
    /// Story handle; empty unless `status` is [`STATUS_OK`].
    pub story_id: String,
}

impl AcquireStoryResult {
    /// Failure-shaped result with an empty handle.
    pub fn failure(status: i32) -> Self {
        Self {
            status,
            story_id: String::new(),
        }
    }
}

/// Outcome of `get_chronicle_attr`: a status and the attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChronicleAttrResult {
    pub status: i32,
    /// Only meaningful when `status` is [`STATUS_OK`].
    pub value: String,
}

impl ChronicleAttrResult {
    /// Failure-shaped result with an empty value.
    pub fn failure(status: i32) -> Self {
        Self {
            status,
            value: String::new(),
        }
    }
}
