use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{self, ConfigError, SimulationConfig};

pub(crate) struct AppWiring {
    pub(crate) config: SimulationConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!("=== Bomber Startup ===");

    let config = config::load_from_env()?;
    info!(
        target_tps = config.target_tps,
        ticks = config.ticks,
        seed = config.seed,
        arena_width = config.arena_width,
        arena_height = config.arena_height,
        npc_count = config.npc_count,
        autopilot = config.autopilot,
        "config_loaded"
    );

    Ok(AppWiring { config })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
