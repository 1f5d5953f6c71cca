//! Wire-level contract shared by the server and any client.

pub mod messages;

pub use messages::{ClientCommand, ServerMessage, ValidationError, MAX_RATINGS_BATCH};
