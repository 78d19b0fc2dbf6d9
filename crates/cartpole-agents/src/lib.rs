//! Tabular Q-learning agent for CartPole.
//!
//! `QTableAgent` implements the [`Agent`](cartpole_core::Agent) trait with an
//! ε-greedy Q-table over discretized observations. It stands in for a full
//! RL framework behind the same four-operation seam: train one iteration,
//! predict, snapshot, restore. Training drivers treat its iteration reports
//! as opaque nested records.

use cartpole_core::{train as checkpoint, Action, Agent, Environment, Result};
use rand::prelude::*;
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;

mod config;
pub use config::AgentConfig;

const GAMMA: f32 = 0.99;
/// Per-episode multiplicative exploration decay.
const EPSILON_DECAY: f32 = 0.995;
const EPSILON_MIN: f32 = 0.05;
const EPSILON_START: f32 = 1.0;

/// Buckets per observation dimension: x, x_dot, theta, theta_dot.
const OBS_BINS: [usize; 4] = [6, 6, 12, 12];
const OBS_LOW: [f32; 4] = [-2.4, -3.0, -0.21, -3.5];
const OBS_HIGH: [f32; 4] = [2.4, 3.0, 0.21, 3.5];
const N_STATES: usize = OBS_BINS[0] * OBS_BINS[1] * OBS_BINS[2] * OBS_BINS[3];
const N_ACTIONS: usize = 2;

/// ε-greedy tabular Q-learner over discretized CartPole observations.
pub struct QTableAgent {
    config: AgentConfig,
    q: Vec<[f32; N_ACTIONS]>,
    epsilon: f32,
    iteration: u32,
    env: Box<dyn Environment>,
}

impl fmt::Debug for QTableAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QTableAgent")
            .field("config", &self.config)
            .field("epsilon", &self.epsilon)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

impl QTableAgent {
    /// Build a fresh agent from its configuration. The training environment
    /// is constructed here; an unknown environment id fails the build.
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        let env = cartpole_env::make(&config.env_id)?;
        Ok(Self {
            config,
            q: vec![[0.0; N_ACTIONS]; N_STATES],
            epsilon: EPSILON_START,
            iteration: 0,
            env,
        })
    }

    /// Reconstruct an agent from a save directory written by the training
    /// driver. A different in-memory instance, same learned parameters.
    pub fn from_checkpoint(dir: &Path) -> Result<Self> {
        let snapshot = checkpoint::load_checkpoint(dir)?;
        let config = match snapshot.get("config") {
            Some(raw) => serde_json::from_value(raw.clone())?,
            None => AgentConfig::default(),
        };
        let mut agent = config.build()?;
        agent.restore(snapshot)?;
        Ok(agent)
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current exploration probability.
    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// One ε-greedy episode with online Q-updates. Returns the episode return.
    fn run_training_episode(&mut self) -> Result<f32> {
        let mut rng = thread_rng();
        let mut state = discretize(&self.env.reset()?);
        let mut total_reward = 0.0_f32;
        let mut done = false;

        while !done {
            let explore = rng.gen::<f32>() < self.epsilon;
            let action = if explore {
                rng.gen_range(0..N_ACTIONS)
            } else {
                argmax(&self.q[state])
            };

            let outcome = self.env.step(&Action::Discrete(action as i64))?;
            let next_state = discretize(&outcome.observation);
            done = outcome.done();

            // No bootstrap across a terminal transition; truncation still
            // bootstraps since the episode could have continued.
            let target = if outcome.terminated {
                outcome.reward
            } else {
                outcome.reward + GAMMA * max_value(&self.q[next_state])
            };
            let entry = &mut self.q[state][action];
            *entry += self.config.learning_rate * (target - *entry);

            total_reward += outcome.reward;
            state = next_state;
        }

        self.epsilon = (self.epsilon * EPSILON_DECAY).max(EPSILON_MIN);
        Ok(total_reward)
    }

    /// Mean return over `evaluation_episodes` greedy episodes.
    fn evaluate(&mut self) -> Result<f32> {
        let episodes = self.config.evaluation_episodes.max(1);
        let mut total = 0.0_f32;
        for _ in 0..episodes {
            let mut state = discretize(&self.env.reset()?);
            let mut done = false;
            while !done {
                let action = argmax(&self.q[state]);
                let outcome = self.env.step(&Action::Discrete(action as i64))?;
                total += outcome.reward;
                done = outcome.done();
                state = discretize(&outcome.observation);
            }
        }
        Ok(total / episodes as f32)
    }
}

impl Agent for QTableAgent {
    fn train_iteration(&mut self) -> Result<Value> {
        let episodes = self.config.episodes_per_iteration().max(1);
        let mut returns = Vec::with_capacity(episodes as usize);
        for _ in 0..episodes {
            returns.push(self.run_training_episode()?);
        }
        let train_mean = returns.iter().sum::<f32>() / returns.len() as f32;

        self.iteration += 1;
        let mut report = json!({
            "training_iteration": self.iteration,
            "env_runners": {
                "episode_return_mean": train_mean,
                "episodes_this_iter": episodes,
            },
        });

        let interval = self.config.evaluation_interval;
        if interval > 0 && self.iteration % interval == 0 {
            let eval_mean = self.evaluate()?;
            report["evaluation"] = json!({
                "env_runners": {"episode_return_mean": eval_mean},
            });
        }

        Ok(report)
    }

    /// Greedy action for `observation`; ties break toward the lower index.
    fn predict(&self, observation: &[f32]) -> Action {
        Action::Discrete(argmax(&self.q[discretize(observation)]) as i64)
    }

    fn snapshot(&self) -> Value {
        json!({
            "agent": "q-table",
            "config": serde_json::to_value(&self.config).unwrap_or(Value::Null),
            "epsilon": self.epsilon,
            "iteration": self.iteration,
            "q": serde_json::to_value(&self.q).unwrap_or(Value::Null),
        })
    }

    fn restore(&mut self, snapshot: Value) -> Result<()> {
        if let Some(raw) = snapshot.get("config") {
            let config: AgentConfig = serde_json::from_value(raw.clone())?;
            if config.env_id != self.config.env_id {
                self.env = cartpole_env::make(&config.env_id)?;
            }
            self.config = config;
        }
        if let Some(e) = snapshot.get("epsilon").and_then(Value::as_f64) {
            let e = e as f32;
            self.epsilon = if e.is_finite() {
                e.clamp(0.0, 1.0)
            } else {
                EPSILON_MIN
            };
        }
        if let Some(iteration) = snapshot.get("iteration").and_then(Value::as_u64) {
            self.iteration = iteration as u32;
        }
        if let Some(raw) = snapshot.get("q") {
            let table: Vec<[f32; N_ACTIONS]> = serde_json::from_value(raw.clone())?;
            if table.len() == N_STATES {
                self.q = table;
            } else {
                warn_snapshot(table.len());
                self.q = vec![[0.0; N_ACTIONS]; N_STATES];
            }
        }
        Ok(())
    }
}

/// Map an observation onto a flat Q-table index. Values outside the bucket
/// range clamp into the edge buckets; missing dimensions read as 0.
fn discretize(observation: &[f32]) -> usize {
    let mut index = 0;
    for dim in 0..OBS_BINS.len() {
        let value = observation.get(dim).copied().unwrap_or(0.0);
        let span = OBS_HIGH[dim] - OBS_LOW[dim];
        let normalized = ((value - OBS_LOW[dim]) / span).clamp(0.0, 1.0);
        let bucket = ((normalized * OBS_BINS[dim] as f32) as usize).min(OBS_BINS[dim] - 1);
        index = index * OBS_BINS[dim] + bucket;
    }
    index
}

fn argmax(values: &[f32; N_ACTIONS]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn max_value(values: &[f32; N_ACTIONS]) -> f32 {
    values.iter().copied().fold(f32::MIN, f32::max)
}

#[allow(unused_variables)]
fn warn_snapshot(len: usize) {
    #[cfg(feature = "telemetry")]
    tracing::warn!(len, "snapshot Q-table has unexpected size; starting from scratch");
    #[cfg(not(feature = "telemetry"))]
    eprintln!("Warning: snapshot Q-table has unexpected size ({len}); starting from scratch");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discretize_clamps_into_edge_buckets() {
        let low = discretize(&[-100.0, -100.0, -100.0, -100.0]);
        let high = discretize(&[100.0, 100.0, 100.0, 100.0]);
        assert_eq!(low, 0);
        assert_eq!(high, N_STATES - 1);
        assert!(discretize(&[0.0, 0.0, 0.0, 0.0]) < N_STATES);
    }

    #[test]
    fn predict_is_greedy_and_deterministic() {
        let mut agent = AgentConfig::cartpole().build().expect("build");
        let obs = [0.0, 0.0, 0.0, 0.0];
        let state = discretize(&obs);
        agent.q[state] = [0.25, 0.75];
        assert_eq!(agent.predict(&obs), Action::Discrete(1));
        assert_eq!(agent.predict(&obs), Action::Discrete(1));

        agent.q[state] = [0.75, 0.25];
        assert_eq!(agent.predict(&obs), Action::Discrete(0));
    }

    #[test]
    fn train_iteration_reports_nested_metrics() {
        let config = AgentConfig {
            num_env_runners: 1,
            num_envs_per_runner: 1,
            evaluation_episodes: 1,
            evaluation_interval: 1,
            ..AgentConfig::cartpole()
        };
        let mut agent = config.build().expect("build");
        let report = agent.train_iteration().expect("iteration");

        assert_eq!(report["training_iteration"], 1);
        assert!(report["env_runners"]["episode_return_mean"].is_number());
        assert!(report["evaluation"]["env_runners"]["episode_return_mean"].is_number());
    }

    #[test]
    fn evaluation_block_is_absent_when_disabled() {
        let config = AgentConfig {
            num_env_runners: 1,
            num_envs_per_runner: 1,
            evaluation_interval: 0,
            ..AgentConfig::cartpole()
        };
        let mut agent = config.build().expect("build");
        let report = agent.train_iteration().expect("iteration");
        assert!(report.get("evaluation").is_none());
    }

    #[test]
    fn snapshot_roundtrip_restores_learned_state() {
        let mut agent = AgentConfig::cartpole().build().expect("build");
        agent.epsilon = 0.3;
        agent.iteration = 12;
        agent.q[17] = [0.5, -0.5];

        let snap = agent.snapshot();
        let mut restored = AgentConfig::cartpole().build().expect("build");
        restored.restore(snap).expect("restore");

        assert!((restored.epsilon - 0.3).abs() < f32::EPSILON);
        assert_eq!(restored.iteration, 12);
        assert_eq!(restored.q[17], [0.5, -0.5]);
    }

    #[test]
    fn restore_clamps_pathological_epsilon() {
        let mut agent = AgentConfig::cartpole().build().expect("build");
        agent
            .restore(json!({"epsilon": 7.5}))
            .expect("restore");
        assert_eq!(agent.epsilon, 1.0);
    }

    #[test]
    fn checkpoint_roundtrip_through_directory() {
        let dir = std::env::temp_dir().join(format!(
            "cartpole_agent_ckpt_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);

        let mut agent = AgentConfig::cartpole().build().expect("build");
        agent.q[3] = [1.5, 0.5];
        agent.iteration = 4;
        checkpoint::save_checkpoint(&dir, &agent).expect("save");

        let restored = QTableAgent::from_checkpoint(&dir).expect("reload");
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(restored.q[3], [1.5, 0.5]);
        assert_eq!(restored.iteration, 4);
        assert_eq!(restored.config, AgentConfig::default());
    }

    #[test]
    fn build_rejects_unknown_environment() {
        let config = AgentConfig {
            env_id: "Pendulum-v1".to_string(),
            ..AgentConfig::cartpole()
        };
        assert!(config.build().is_err());
    }
}
