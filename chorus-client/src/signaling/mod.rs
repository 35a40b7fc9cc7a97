mod channel;
mod event;
mod output;

pub use channel::SignalingChannel;
pub use event::SignalingEvent;
pub use output::SignalingOutput;
