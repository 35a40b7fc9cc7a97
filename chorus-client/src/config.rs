use chorus_core::{IceServerConfig, Role};
use std::time::Duration;

/// Every knob of a conference session in one place, with its default. There
/// are no convenience-constructor chains: construct, adjust fields, connect.
#[derive(Debug, Clone)]
pub struct ConferenceConfig {
    /// Websocket signaling endpoint, e.g. `wss://host:5443/App/websocket`.
    pub server_url: String,
    /// Separate signaling endpoint for publishing roles. Deployments commonly
    /// terminate presenter traffic on a different port; `None` means every
    /// role uses `server_url`.
    pub presenter_url: Option<String>,
    /// Room to join.
    pub room_id: String,
    /// Immutable participant role; only `Presenter` publishes.
    pub role: Role,
    /// Preferred stream id sent with `joinRoom`; empty string requests a
    /// server-assigned id.
    pub preferred_stream_id: String,
    /// Auth token attached to offers/answers when present.
    pub token: Option<String>,
    /// Create a data channel alongside every offering connection.
    pub enable_data_channel: bool,
    /// Cadence of the listener-count poll, which also drives the membership
    /// refresh.
    pub stats_interval: Duration,
    /// ICE servers handed to the transport factory.
    pub ice_servers: Vec<IceServerConfig>,
}

impl ConferenceConfig {
    pub fn new(server_url: impl Into<String>, room_id: impl Into<String>, role: Role) -> Self {
        Self {
            server_url: server_url.into(),
            presenter_url: None,
            room_id: room_id.into(),
            role,
            preferred_stream_id: String::new(),
            token: None,
            enable_data_channel: true,
            stats_interval: Duration::from_secs(5),
            ice_servers: vec![IceServerConfig {
                urls: vec!["stun:stun.l.google.com:19302".to_string()],
                username: None,
                credential: None,
            }],
        }
    }

    /// The signaling endpoint this session actually connects to. The role
    /// picks it: publishing roles use `presenter_url` when one is configured,
    /// everyone else uses `server_url`. The stats URL is derived from the
    /// same endpoint.
    pub fn signaling_endpoint(&self) -> &str {
        if self.role.publishes() {
            self.presenter_url.as_deref().unwrap_or(&self.server_url)
        } else {
            &self.server_url
        }
    }
}
