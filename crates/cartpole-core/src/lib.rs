use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod error;
pub mod metrics;
pub mod rollout;
pub mod runtime;
pub mod trace;
pub mod train;

pub use error::{CoreError, Result};

/// An action emitted by an agent: a discrete index or a small vector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Action {
    Discrete(i64),
    Continuous(Vec<f32>),
}

/// Result of stepping an environment once.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Vec<f32>,
    pub reward: f32,
    /// Episode ended due to goal/failure.
    pub terminated: bool,
    /// Episode ended due to a time limit.
    pub truncated: bool,
}

impl StepOutcome {
    /// Done flag (terminal OR truncated).
    #[must_use]
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// A trainable decision-making object, backed by whatever learner is
/// available. Everything else in this workspace depends on exactly these
/// four operations.
pub trait Agent {
    /// Run one opaque training iteration and return a nested report record.
    fn train_iteration(&mut self) -> Result<Value>;

    /// Inference-only action selection. Any exploration is the agent's own
    /// concern; callers wanting determinism must use a greedy agent.
    fn predict(&self, observation: &[f32]) -> Action;

    /// Full learned state as JSON, suitable for checkpointing.
    fn snapshot(&self) -> Value;

    /// Rebuild learned state from a snapshot produced by [`Agent::snapshot`].
    fn restore(&mut self, snapshot: Value) -> Result<()>;
}

/// A live simulation an agent can act in.
pub trait Environment {
    /// Start a fresh episode and return the initial observation.
    fn reset(&mut self) -> Result<Vec<f32>>;

    /// Advance the simulation with `action`.
    fn step(&mut self, action: &Action) -> Result<StepOutcome>;

    /// Release any underlying resource. Default is a no-op; owners relying
    /// on `Drop` need not override this.
    fn close(&mut self) {}
}
