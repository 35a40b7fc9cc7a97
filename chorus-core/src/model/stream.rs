use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque stream token assigned by the signaling server. Uniquely names one
/// publishing session within a room and is never reused while the room exists.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant role, immutable for the lifetime of a session. Only the
/// presenter publishes media; every role subscribes to remote streams.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Listener,
    Presenter,
    Interpreter,
}

impl Role {
    pub fn publishes(&self) -> bool {
        matches!(self, Role::Presenter)
    }
}

/// Direction of one per-stream connection record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Publish,
    Subscribe,
}
