pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod http;
pub mod net;
pub mod router;

pub use proxy_log::{debug, error, info, trace, warn};
