use chorus_core::StreamId;
use serde::Deserialize;
use tracing::debug;

/// Watcher counters returned by the broadcast-statistics endpoint. Only the
/// WebRTC count feeds the conference session.
#[derive(Debug, Default, Deserialize)]
pub struct BroadcastStats {
    #[serde(default, rename = "totalRTMPWatchersCount")]
    pub total_rtmp_watchers_count: i64,
    #[serde(default, rename = "totalHLSWatchersCount")]
    pub total_hls_watchers_count: i64,
    #[serde(default, rename = "totalWebRTCWatchersCount")]
    pub total_webrtc_watchers_count: i64,
}

/// Derive the REST stats URL from the websocket signaling endpoint by
/// stripping the scheme and the `/websocket` path suffix.
pub fn stats_endpoint(server_url: &str, stream_id: &StreamId) -> String {
    let host = server_url
        .trim_start_matches("wss://")
        .trim_start_matches("ws://");
    let host = host.strip_suffix("/websocket").unwrap_or(host);
    format!("https://{host}/rest/v2/broadcasts/{stream_id}/broadcast-statistics")
}

/// Fetch the current WebRTC watcher count from `url`. Never fails: fetch or
/// decode problems yield the idle count of 0 so a single bad poll cannot halt
/// the cadence, and server-reported negatives are clamped.
pub async fn fetch_listener_count(client: &reqwest::Client, url: &str) -> u32 {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            debug!("listener count fetch failed: {e}");
            return 0;
        }
    };
    match response.json::<BroadcastStats>().await {
        Ok(stats) => stats.total_webrtc_watchers_count.max(0) as u32,
        Err(e) => {
            debug!("listener count decode failed: {e}");
            0
        }
    }
}
