pub use chorus_client::{ConferenceConfig, ConferenceHandle, connect};
pub use chorus_core::model::{Role, StreamId};

pub mod model {
    pub use chorus_core::model::*;
}

pub mod client {
    pub use chorus_client::*;
}

pub mod error {
    pub use chorus_core::error::*;
}
