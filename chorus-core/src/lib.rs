pub mod error;
pub mod model;

pub use error::{ConferenceError, server_error_message};
pub use model::*;
