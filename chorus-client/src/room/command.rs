use bytes::Bytes;
use chorus_core::{AudioInfo, CredentialsRequest, ListenerMessage, PresenterMessage};

/// Commands accepted by the conference session, dispatched into its event
/// loop so every mutation happens on the single writer.
#[derive(Debug)]
pub enum ConferenceCommand {
    /// Flip the audio gate on the publish record, if one exists.
    ToggleLocalAudio,
    /// Mute the audio path on every subscribe record.
    MuteIncomingAudio,
    /// Mute only the first subscribe record. Deployments with one remote
    /// speaker address it this way; later records are untouched.
    DisableFirstIncomingAudio,
    /// Send raw application JSON bytes over the publish record's channel.
    Broadcast(Bytes),
    /// Send raw application JSON bytes over the first subscribe record's
    /// channel (single-listener reply convention).
    Reply(Bytes),
    /// Typed broadcast: a file handout from the presenter.
    SendFile(PresenterMessage),
    /// Typed reply: a chat message toward the presenter.
    SendMessage(ListenerMessage),
    /// Typed broadcast: shared audio playback info.
    SendAudioInfo(AudioInfo),
    /// Typed reply: credentials request toward the presenter.
    RequestCredentials(CredentialsRequest),
    /// Tear the session down: close every record, send `leaveRoom`,
    /// disconnect the channel, clear state.
    Leave,
}
