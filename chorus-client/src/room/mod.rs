mod command;
mod conference;
mod event;
mod membership;

pub use command::ConferenceCommand;
pub use conference::{ConferenceHandle, ConferenceSession, connect};
pub use event::ConferenceEvent;
pub use membership::{MembershipDiff, Room, diff_membership};
