pub mod block;
pub mod display;
mod from_yaml_impls;
pub mod types;
pub mod validate;

pub use block::{Block, ListenerGroup, LocationBlock, ServerBlock, group_by_listener};
pub use display::display_config;
pub use types::{AppConfig, RouteConfig, ServerConfig};
pub use validate::validate_configs;

use parser::FromYaml;

use crate::error::Result;

/// Reads, parses and validates the configuration file at `path`, returning
/// the flat, conflict-free list of server blocks ready for grouping.
pub fn load(path: &str) -> Result<Vec<ServerConfig>> {
    let source = std::fs::read_to_string(path)?;
    let app_config = AppConfig::from_str(&source)?;
    Ok(validate_configs(app_config.servers))
}
