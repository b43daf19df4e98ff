//! RL ensemble configuration parsing from environment variables.

use std::env;
use std::path::PathBuf;

/// Policy model locations
#[derive(Debug, Clone)]
pub struct EnsembleEnvConfig {
    pub models_dir: PathBuf,
    /// Lower-case model names, e.g. `sac`, `ppo`
    pub models: Vec<String>,
}

impl Default for EnsembleEnvConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            models: ["sac", "ppo", "a2c", "td3", "ddpg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EnsembleEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let models = env::var("RL_MODELS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|m| m.trim().to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or(defaults.models);

        Self {
            models_dir: env::var("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensemble_config_defaults() {
        let config = EnsembleEnvConfig::from_env();
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.models, vec!["sac", "ppo", "a2c", "td3", "ddpg"]);
    }
}
