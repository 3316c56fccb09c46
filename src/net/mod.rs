pub mod connection;
pub mod listener;
pub mod readiness;

pub use connection::{Connection, ReadOutcome, State, WriteOutcome};
pub use listener::Listener;
pub use readiness::ReadinessMux;
