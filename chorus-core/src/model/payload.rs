use serde::{Deserialize, Serialize};

/// Chat message sent by a listener back to the presenter. Travels over the
/// first subscribe connection's data channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenerMessage {
    pub id: String,
    pub username: String,
    pub message: String,
    #[serde(rename = "isFavorite")]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// File handout (image/PDF) broadcast by the presenter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresenterMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// Playback information for a shared audio resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioInfo {
    pub audio_id: i64,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
}

/// Request for access credentials, sent from a listener toward the presenter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialsRequest {
    pub id: String,
    pub username: String,
}
