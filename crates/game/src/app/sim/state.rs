use std::time::Duration;

use engine::{PhysicsConfig, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::app::config::SimulationConfig;

/// Gameplay constants the handlers read; derived from the loaded config.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GameRules {
    pub(crate) arena_width: u32,
    pub(crate) arena_height: u32,
    pub(crate) npc_count: u32,
    pub(crate) pickup_count: u32,
    pub(crate) crate_density: f32,
    pub(crate) player_speed: f32,
    pub(crate) chaser_speed: f32,
    pub(crate) walker_speed: f32,
    pub(crate) bomb_fuse: Duration,
    pub(crate) fire_lifetime_mean: Duration,
    pub(crate) fire_lifetime_jitter: Duration,
    pub(crate) particle_lifetime: Duration,
    pub(crate) restart_delay: Duration,
    pub(crate) npc_turn_interval_ticks: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

impl GameRules {
    pub(crate) fn from_config(config: &SimulationConfig) -> Self {
        Self {
            arena_width: config.arena_width,
            arena_height: config.arena_height,
            npc_count: config.npc_count,
            pickup_count: config.pickup_count,
            crate_density: config.crate_density,
            player_speed: 5.0,
            chaser_speed: 2.5,
            walker_speed: 3.0,
            bomb_fuse: Duration::from_millis(config.bomb_fuse_ms),
            fire_lifetime_mean: Duration::from_millis(config.fire_lifetime_mean_ms),
            fire_lifetime_jitter: Duration::from_millis(config.fire_lifetime_jitter_ms),
            particle_lifetime: Duration::from_millis(config.particle_lifetime_ms),
            restart_delay: Duration::from_millis(config.restart_delay_ms),
            npc_turn_interval_ticks: config.npc_turn_interval_ticks,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GameStats {
    pub(crate) games_started: u32,
    pub(crate) players_died: u32,
    pub(crate) bombs_planted: u32,
    pub(crate) bombs_exploded: u32,
    pub(crate) crates_destroyed: u32,
    pub(crate) pickups_collected: u32,
    pub(crate) npcs_destroyed: u32,
}

#[derive(Debug)]
pub(crate) struct GameState {
    pub(crate) world: World,
    pub(crate) rules: GameRules,
    pub(crate) rng: StdRng,
    pub(crate) stats: GameStats,
}

impl GameState {
    pub(crate) fn new(rules: GameRules, physics: PhysicsConfig, seed: u64) -> Self {
        Self {
            world: World::new(physics),
            rules,
            rng: StdRng::seed_from_u64(seed),
            stats: GameStats::default(),
        }
    }
}
