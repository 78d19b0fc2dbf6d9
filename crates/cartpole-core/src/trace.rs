//! Rollout trace types and the JSON interchange format.
//!
//! A rollout file is a UTF-8 JSON array of [`Episode`] objects. There is no
//! schema version field and no checksum; readers tolerate missing optional
//! fields by defaulting them.

use crate::{Action, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// One (observation, action, reward, next-observation, done) tuple.
///
/// Immutable once created; written once, read many times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transition {
    pub observation: Vec<f32>,
    pub action: Action,
    pub reward: f32,
    pub next_observation: Vec<f32>,
    #[serde(default)]
    pub done: bool,
    /// Originating training iteration, for provenance when rollouts are
    /// collected mid-training.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_iteration: Option<u32>,
}

/// One complete simulated run from reset to termination or truncation.
///
/// `steps` is in time order and is never reordered. Invariant:
/// `total_reward` equals the sum of the step rewards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    /// 1-based episode identifier.
    pub episode_id: u32,
    #[serde(default)]
    pub total_reward: f32,
    #[serde(default)]
    pub steps: Vec<Transition>,
}

impl Episode {
    /// Sum of the constituent step rewards.
    #[must_use]
    pub fn reward_sum(&self) -> f32 {
        self.steps.iter().map(|s| s.reward).sum()
    }
}

/// Serialize a rollout collection as pretty-printed JSON, overwriting any
/// existing file at `path`.
pub fn write_rollouts(path: &Path, episodes: &[Episode]) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, episodes)?;
    Ok(())
}

/// Read a rollout collection from `path`.
pub fn read_rollouts(path: &Path) -> Result<Vec<Episode>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

/// Parse a rollout collection from in-memory JSON text.
pub fn parse_rollouts(text: &str) -> Result<Vec<Episode>> {
    Ok(serde_json::from_str(text)?)
}
