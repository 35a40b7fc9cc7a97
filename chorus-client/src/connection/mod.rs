mod stream_connection;

pub use stream_connection::{NegotiationState, StreamConnection};
