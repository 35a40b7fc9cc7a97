use thiserror::Error;

/// Failure taxonomy for the conference core. Every externally triggered
/// condition degrades to a reported value; none of these abort the room or
/// unrelated connection records.
#[derive(Debug, Error)]
pub enum ConferenceError {
    /// Socket or connect failure on the signaling channel. Reported, not
    /// retried; reconnection is a caller responsibility.
    #[error("signaling transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected wire data. The offending frame is dropped and
    /// the session continues.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Offer/answer creation or application failed for one stream. The
    /// affected record transitions to failed and is closed.
    #[error("negotiation failed for stream {stream_id}: {reason}")]
    Negotiation { stream_id: String, reason: String },

    /// Local capture could not be attached; the record never reaches
    /// negotiating.
    #[error("local media unavailable: {0}")]
    MediaUnavailable(String),

    /// Server-reported semantic error, already rendered human-readable.
    #[error("{0}")]
    Server(String),
}

/// Map a server error definition to a human-readable message. Unknown codes
/// fall back to a generic templated message.
pub fn server_error_message(definition: &str) -> String {
    match definition {
        "no_stream_exist" => "No stream exists on the server.".to_string(),
        "unauthorized_access" => "Unauthorized access: check your token.".to_string(),
        other => format!("An error occurred: {other}"),
    }
}
