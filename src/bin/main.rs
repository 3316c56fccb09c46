use server_proxy::config;
use server_proxy::engine::Engine;
use server_proxy::error::Result;
use server_proxy::{error, info};


fn main() -> Result<()> {
    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());

    let servers = config::load(&path)?;
    config::display_config(&servers);

    let groups = config::group_by_listener(&servers);
    info!("loaded {} listener group(s) from {path}", groups.len());

    let mut engine = Engine::new(groups)?;
    engine.run()
}
