mod envelope;
mod payload;
mod signaling;
mod stream;

pub use envelope::{decode_payload, encode_payload, encode_raw};
pub use payload::{AudioInfo, CredentialsRequest, ListenerMessage, PresenterMessage};
pub use signaling::{IceServerConfig, SdpKind, SignalMessage, notification};
pub use stream::{Direction, Role, StreamId};
