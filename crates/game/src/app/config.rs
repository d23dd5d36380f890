use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::PhysicsConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const CONFIG_PATH_ENV_VAR: &str = "BOMBER_CONFIG";
pub(crate) const TICKS_ENV_VAR: &str = "BOMBER_TICKS";
const MAX_ARENA_SIDE: u32 = 255;

/// Everything the headless simulation can be tuned with. Missing JSON fields
/// keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationConfig {
    pub(crate) target_tps: u32,
    pub(crate) ticks: u64,
    pub(crate) seed: u64,
    pub(crate) arena_width: u32,
    pub(crate) arena_height: u32,
    pub(crate) npc_count: u32,
    pub(crate) pickup_count: u32,
    pub(crate) crate_density: f32,
    pub(crate) bomb_fuse_ms: u64,
    pub(crate) fire_lifetime_mean_ms: u64,
    pub(crate) fire_lifetime_jitter_ms: u64,
    pub(crate) particle_lifetime_ms: u64,
    pub(crate) restart_delay_ms: u64,
    pub(crate) npc_turn_interval_ticks: u32,
    pub(crate) autopilot: bool,
    pub(crate) physics: PhysicsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            ticks: 3_600,
            seed: 0x5eed,
            arena_width: 15,
            arena_height: 13,
            npc_count: 3,
            pickup_count: 4,
            crate_density: 0.35,
            bomb_fuse_ms: 2_000,
            fire_lifetime_mean_ms: 1_200,
            fire_lifetime_jitter_ms: 150,
            particle_lifetime_ms: 300,
            restart_delay_ms: 2_000,
            npc_turn_interval_ticks: 30,
            autopilot: true,
            physics: PhysicsConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Defaults, then the JSON file named by `BOMBER_CONFIG`, then `BOMBER_TICKS`.
pub(crate) fn load_from_env() -> Result<SimulationConfig, ConfigError> {
    let path = env::var_os(CONFIG_PATH_ENV_VAR).map(PathBuf::from);
    let ticks = env::var(TICKS_ENV_VAR).ok();
    load(path.as_deref(), ticks.as_deref())
}

pub(crate) fn load(
    path: Option<&Path>,
    ticks_override: Option<&str>,
) -> Result<SimulationConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse(&raw, path)?
        }
        None => SimulationConfig::default(),
    };

    if let Some(raw) = ticks_override {
        config.ticks = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidEnv {
                var: TICKS_ENV_VAR,
                value: raw.to_string(),
            })?;
    }

    validate(&config)?;
    Ok(config)
}

fn parse(raw: &str, path: &Path) -> Result<SimulationConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            field,
            source: error.into_inner(),
        }
    })
}

fn validate(config: &SimulationConfig) -> Result<(), ConfigError> {
    let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
    if config.target_tps == 0 {
        return invalid("target_tps", "must be positive");
    }
    if config.ticks == 0 {
        return invalid("ticks", "must be positive");
    }
    if config.arena_width < 3 || config.arena_height < 3 {
        return invalid("arena_width/arena_height", "arena must be at least 3x3");
    }
    if config.arena_width > MAX_ARENA_SIDE || config.arena_height > MAX_ARENA_SIDE {
        return invalid("arena_width/arena_height", "arena side exceeds the maximum");
    }
    if !(0.0..=1.0).contains(&config.crate_density) {
        return invalid("crate_density", "must be within [0, 1]");
    }
    if config.fire_lifetime_jitter_ms >= config.fire_lifetime_mean_ms {
        return invalid("fire_lifetime_jitter_ms", "must be smaller than the mean");
    }
    if config.npc_turn_interval_ticks == 0 {
        return invalid("npc_turn_interval_ticks", "must be positive");
    }
    let physics = &config.physics;
    if !(physics.velocity_decay_per_second >= 0.0
        && physics.acceleration_gain >= 0.0
        && physics.corner_inset >= 0.0)
    {
        return invalid("physics", "rates and inset must be non-negative");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("bomber.json");
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn defaults_are_valid() {
        let config = load(None, None).expect("defaults");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn file_overrides_only_named_fields() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"{ "arena_width": 9, "seed": 7, "physics": { "corner_inset": 0.05 } }"#,
        );
        let config = load(Some(&path), None).expect("config");
        assert_eq!(config.arena_width, 9);
        assert_eq!(config.seed, 7);
        assert_eq!(config.physics.corner_inset, 0.05);
        assert_eq!(
            config.physics.acceleration_gain,
            PhysicsConfig::default().acceleration_gain
        );
        assert_eq!(config.arena_height, SimulationConfig::default().arena_height);
    }

    #[test]
    fn parse_errors_name_the_field() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, r#"{ "physics": { "acceleration_gain": "fast" } }"#);
        match load(Some(&path), None) {
            Err(ConfigError::Parse { field, .. }) => {
                assert_eq!(field, "physics.acceleration_gain")
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, r#"{ "arena_widht": 9 }"#);
        assert!(matches!(
            load(Some(&path), None),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.json");
        assert!(matches!(
            load(Some(&path), None),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn ticks_override_wins_over_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, r#"{ "ticks": 10 }"#);
        let config = load(Some(&path), Some(" 25 ")).expect("config");
        assert_eq!(config.ticks, 25);
        assert!(matches!(
            load(Some(&path), Some("many")),
            Err(ConfigError::InvalidEnv { var: TICKS_ENV_VAR, .. })
        ));
    }

    #[test]
    fn largest_arena_is_accepted() {
        let config = SimulationConfig {
            arena_width: MAX_ARENA_SIDE,
            arena_height: MAX_ARENA_SIDE,
            ..SimulationConfig::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let dir = TempDir::new().expect("temp dir");
        for (contents, expected_field) in [
            (r#"{ "target_tps": 0 }"#, "target_tps"),
            (r#"{ "arena_height": 2 }"#, "arena_width/arena_height"),
            (r#"{ "arena_width": 1000 }"#, "arena_width/arena_height"),
            (r#"{ "arena_height": 256 }"#, "arena_width/arena_height"),
            (
                r#"{ "fire_lifetime_mean_ms": 100, "fire_lifetime_jitter_ms": 100 }"#,
                "fire_lifetime_jitter_ms",
            ),
            (r#"{ "crate_density": 1.5 }"#, "crate_density"),
        ] {
            let path = write_config(&dir, contents);
            match load(Some(&path), None) {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected validation error for {contents}, got {other:?}"),
            }
        }
    }
}
