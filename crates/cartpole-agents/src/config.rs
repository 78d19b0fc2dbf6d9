//! Configuration assembler.
//!
//! Maps named hyperparameters into the nested shape the agent backend
//! consumes. Pure construction: no validation happens here; out-of-range
//! values surface as backend errors at build time.

use crate::QTableAgent;
use cartpole_core::Result;
use serde::{Deserialize, Serialize};

/// Hyperparameters for a trainable agent. Immutable once built; consumed
/// exactly once by [`AgentConfig::build`].
///
/// The network-shape fields (`hidden_widths`, `activation`) are carried for
/// checkpoint compatibility with function-approximation backends; the
/// tabular backend records but does not use them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub env_id: String,
    pub learning_rate: f32,
    pub hidden_widths: Vec<u32>,
    pub activation: String,
    /// Parallel rollout workers an external backend would spawn. The
    /// in-process backend runs their episode budget sequentially.
    pub num_env_runners: u32,
    pub num_envs_per_runner: u32,
    pub evaluation_episodes: u32,
    /// Run evaluation every this many iterations; 0 disables evaluation.
    pub evaluation_interval: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            env_id: "CartPole-v1".to_string(),
            learning_rate: 5e-4,
            hidden_widths: vec![256, 256],
            activation: "tanh".to_string(),
            num_env_runners: 4,
            num_envs_per_runner: 2,
            evaluation_episodes: 10,
            evaluation_interval: 1,
        }
    }
}

impl AgentConfig {
    /// Preconfigured defaults for CartPole.
    #[must_use]
    pub fn cartpole() -> Self {
        Self::default()
    }

    /// Episodes one training iteration runs.
    #[must_use]
    pub fn episodes_per_iteration(&self) -> u32 {
        self.num_env_runners * self.num_envs_per_runner
    }

    /// Construct the agent. Fails if the environment id is unknown to the
    /// backend.
    pub fn build(self) -> Result<QTableAgent> {
        QTableAgent::from_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.env_id, "CartPole-v1");
        assert_eq!(config.learning_rate, 5e-4);
        assert_eq!(config.hidden_widths, vec![256, 256]);
        assert_eq!(config.activation, "tanh");
        assert_eq!(config.num_env_runners, 4);
        assert_eq!(config.num_envs_per_runner, 2);
        assert_eq!(config.evaluation_episodes, 10);
        assert_eq!(config.evaluation_interval, 1);
    }

    #[test]
    fn overrides_survive_serde_roundtrip() {
        let config = AgentConfig {
            learning_rate: 1e-3,
            num_env_runners: 1,
            ..AgentConfig::default()
        };
        let value = serde_json::to_value(&config).expect("serialize");
        let restored: AgentConfig = serde_json::from_value(value).expect("deserialize");
        assert_eq!(config, restored);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let restored: AgentConfig =
            serde_json::from_str(r#"{"env_id":"CartPole-v1"}"#).expect("tolerant parse");
        assert_eq!(restored, AgentConfig::default());
    }

    #[test]
    fn episodes_per_iteration_is_runners_times_envs() {
        assert_eq!(AgentConfig::default().episodes_per_iteration(), 8);
    }
}
