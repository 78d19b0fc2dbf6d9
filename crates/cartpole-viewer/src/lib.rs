#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Rollout viewer.
//!
//! Loads an interchange document (a JSON array of episodes) from an explicit
//! file or a conventional default path and renders terminal summaries: an
//! episode selector, a preview table of the first transitions, and a
//! per-step reward chart. Malformed input becomes a user-visible message,
//! never a crash.

use cartpole_core::trace::{Episode, Transition};
use cartpole_core::Action;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Maximum number of transitions shown in the preview table.
pub const PREVIEW_ROWS: usize = 10;
/// Height in rows of the ASCII reward chart.
pub const CHART_HEIGHT: usize = 8;
/// Conventional on-disk location when no upload is supplied.
pub const DEFAULT_ROLLOUT_FILE: &str = "rollout_data.json";

/// What the viewer has to show.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerData {
    Ready {
        episodes: Vec<Episode>,
        /// A failure on the preferred source that the fallback papered
        /// over; shown alongside the data, like an error banner above a
        /// rendered page.
        warning: Option<String>,
    },
    /// Nothing available from either source; render the prompt and stop.
    Empty { prompt: String },
    /// Input was present but unusable; render the message and stop.
    Failed { message: String },
}

/// Load rollout data from `upload` if given, falling back to `fallback`.
///
/// A parse failure on the upload is remembered and the fallback is still
/// tried; if the fallback yields data the failure is carried as a warning,
/// otherwise it is the result.
#[must_use]
pub fn load(upload: Option<&Path>, fallback: &Path) -> ViewerData {
    let mut failure: Option<String> = None;

    if let Some(path) = upload {
        match read_episodes(path) {
            Ok(episodes) if !episodes.is_empty() => {
                return ViewerData::Ready {
                    episodes,
                    warning: None,
                }
            }
            Ok(_) => {}
            Err(message) => failure = Some(message),
        }
    }

    if fallback.exists() {
        match read_episodes(fallback) {
            Ok(episodes) if !episodes.is_empty() => {
                return ViewerData::Ready {
                    episodes,
                    warning: failure,
                }
            }
            Ok(_) => {}
            Err(message) => {
                failure.get_or_insert(message);
            }
        }
    }

    match failure {
        Some(message) => ViewerData::Failed { message },
        None => ViewerData::Empty {
            prompt: format!(
                "Upload {DEFAULT_ROLLOUT_FILE} or place it next to the viewer."
            ),
        },
    }
}

fn read_episodes(path: &Path) -> Result<Vec<Episode>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    cartpole_core::trace::parse_rollouts(&text).map_err(|e| format!("Failed to parse JSON: {e}"))
}

/// Selector label: "Episode 3 (R=42.0)".
#[must_use]
pub fn episode_label(episode: &Episode) -> String {
    format!(
        "Episode {} (R={:.1})",
        episode.episode_id, episode.total_reward
    )
}

/// One row of the preview table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreviewRow {
    pub t: usize,
    pub obs0: f32,
    pub obs1: f32,
    pub action: String,
    pub reward: f32,
    pub done: bool,
}

impl PreviewRow {
    fn from_transition(t: usize, step: &Transition) -> Self {
        Self {
            t,
            obs0: step.observation.first().copied().unwrap_or(0.0),
            obs1: step.observation.get(1).copied().unwrap_or(0.0),
            action: format_action(&step.action),
            reward: step.reward,
            done: step.done,
        }
    }
}

fn format_action(action: &Action) -> String {
    match action {
        Action::Discrete(a) => a.to_string(),
        Action::Continuous(v) => serde_json::to_string(v).unwrap_or_else(|_| "?".to_string()),
    }
}

/// Up to the first [`PREVIEW_ROWS`] transitions of an episode.
#[must_use]
pub fn preview_rows(episode: &Episode) -> Vec<PreviewRow> {
    episode
        .steps
        .iter()
        .take(PREVIEW_ROWS)
        .enumerate()
        .map(|(t, step)| PreviewRow::from_transition(t, step))
        .collect()
}

/// Format preview rows as an aligned table.
#[must_use]
pub fn render_table(rows: &[PreviewRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:>9}  {:>9}  {:>6}  {:>7}  {:>5}",
        "t", "obs[0]", "obs[1]", "action", "reward", "done"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:>4}  {:>9.4}  {:>9.4}  {:>6}  {:>7.2}  {:>5}",
            row.t, row.obs0, row.obs1, row.action, row.reward, row.done
        );
    }
    out
}

/// Per-step rewards of the full episode, in time order.
#[must_use]
pub fn reward_series(episode: &Episode) -> Vec<f32> {
    episode.steps.iter().map(|s| s.reward).collect()
}

/// Render a series as a fixed-height ASCII chart, one column per step.
#[must_use]
pub fn render_chart(series: &[f32], height: usize) -> String {
    if series.is_empty() || height == 0 {
        return String::new();
    }

    let max = series.iter().copied().fold(f32::MIN, f32::max);
    let min = series.iter().copied().fold(f32::MAX, f32::min);
    let span = (max - min).max(1e-6);
    let top = height - 1;

    let levels: Vec<usize> = series
        .iter()
        .map(|v| (((v - min) / span) * top as f32).round() as usize)
        .collect();

    let mut out = String::new();
    for row in 0..height {
        let threshold = top - row;
        let label = min + span * threshold as f32 / top.max(1) as f32;
        let _ = write!(out, "{label:>8.2} |");
        for level in &levels {
            out.push(if *level >= threshold { '█' } else { ' ' });
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{:>8} +{}", "", "-".repeat(series.len()));
    out
}

/// Full rendering of one episode: summary, preview table, reward chart.
#[must_use]
pub fn render_episode(episode: &Episode) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", episode_label(episode));
    let _ = writeln!(out, "Total Reward: {:.2}", episode.total_reward);
    let _ = writeln!(out, "Steps: {}", episode.steps.len());
    out.push('\n');
    out.push_str(&render_table(&preview_rows(episode)));
    out.push('\n');
    out.push_str(&render_chart(&reward_series(episode), CHART_HEIGHT));
    out
}
