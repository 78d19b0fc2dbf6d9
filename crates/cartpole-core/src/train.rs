//! Training driver and checkpoint persistence.
//!
//! The driver repeatedly invokes the agent's opaque "train one iteration"
//! operation, keeps the last evaluation return it manages to extract, and
//! optionally persists agent state plus a metrics summary to a directory.

use crate::metrics::{self, MetricsSummary, METRICS_FILE};
use crate::runtime::{self, Runtime};
use crate::{Agent, CoreError, Result};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// File name of the opaque agent-state blob inside a save directory.
pub const CHECKPOINT_FILE: &str = "agent_state.json";

/// Train an agent for exactly `iterations` iterations.
///
/// `build_agent` assembles the agent from its configuration; build failures
/// propagate. Per-iteration failures and missing evaluation metrics are
/// swallowed: the summary keeps the last successfully extracted value, with
/// NaN meaning "never observed". If `save_dir` is given, the directory is
/// created if needed and receives the agent state blob and
/// `training_metrics.json`; those I/O failures are fatal.
pub fn train<A, F>(
    build_agent: F,
    iterations: u32,
    save_dir: Option<&Path>,
    suppress_logs: bool,
) -> Result<MetricsSummary>
where
    A: Agent,
    F: FnOnce() -> Result<A>,
{
    let rt = runtime::ensure_initialized(suppress_logs);

    let mut agent = build_agent()?;

    let mut last_eval_return = f32::NAN;
    for iteration in 0..iterations {
        match agent.train_iteration() {
            Ok(report) => {
                if let Some(value) = metrics::try_extract_eval_return(&report) {
                    last_eval_return = value;
                }
            }
            Err(err) => note_iteration_failure(rt, iteration, &err),
        }
    }

    let summary = MetricsSummary {
        mean_eval_return: last_eval_return,
    };

    if let Some(dir) = save_dir {
        fs::create_dir_all(dir)?;
        save_checkpoint(dir, &agent)?;
        let file = File::create(dir.join(METRICS_FILE))?;
        serde_json::to_writer_pretty(file, &summary)?;
    }

    Ok(summary)
}

/// Persist an agent's state blob into `dir` (created if missing).
pub fn save_checkpoint<A: Agent + ?Sized>(dir: &Path, agent: &A) -> Result<()> {
    fs::create_dir_all(dir)?;
    let blob = json!({
        "saved_at": iso8601_now(),
        "state": agent.snapshot(),
    });
    let file = File::create(dir.join(CHECKPOINT_FILE))?;
    serde_json::to_writer_pretty(file, &blob)?;
    Ok(())
}

/// Read the agent-state snapshot back out of a save directory.
///
/// The snapshot's interior layout is owned by whichever backend wrote it;
/// this only peels the checkpoint envelope.
pub fn load_checkpoint(dir: &Path) -> Result<Value> {
    let path = dir.join(CHECKPOINT_FILE);
    if !path.exists() {
        return Err(CoreError::Checkpoint(format!(
            "no {} in {}",
            CHECKPOINT_FILE,
            dir.display()
        )));
    }
    let file = File::open(path)?;
    let blob: Value = serde_json::from_reader(file)?;
    blob.get("state")
        .cloned()
        .ok_or_else(|| CoreError::Checkpoint("checkpoint blob has no state field".to_string()))
}

fn iso8601_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[allow(unused_variables)]
fn note_iteration_failure(rt: &Runtime, iteration: u32, err: &CoreError) {
    if rt.suppresses_logs() {
        return;
    }
    #[cfg(feature = "telemetry")]
    tracing::warn!(iteration, error = %err, "training iteration failed; keeping last metric");
    #[cfg(not(feature = "telemetry"))]
    eprintln!("Warning: training iteration {iteration} failed; keeping last metric: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Agent};
    use serde_json::json;
    use std::path::PathBuf;

    /// Stub agent whose reports optionally carry an evaluation block.
    struct StubAgent {
        iterations_run: u32,
        eval_every: Option<u32>,
    }

    impl Agent for StubAgent {
        fn train_iteration(&mut self) -> Result<Value> {
            self.iterations_run += 1;
            match self.eval_every {
                Some(every) if self.iterations_run % every == 0 => Ok(json!({
                    "training_iteration": self.iterations_run,
                    "evaluation": {"env_runners": {
                        "episode_return_mean": 10.0 * f64::from(self.iterations_run),
                    }},
                })),
                _ => Ok(json!({"training_iteration": self.iterations_run})),
            }
        }

        fn predict(&self, _observation: &[f32]) -> Action {
            Action::Discrete(0)
        }

        fn snapshot(&self) -> Value {
            json!({"iterations_run": self.iterations_run})
        }

        fn restore(&mut self, snapshot: Value) -> Result<()> {
            self.iterations_run = snapshot["iterations_run"].as_u64().unwrap_or(0) as u32;
            Ok(())
        }
    }

    fn temp_save_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cartpole_train_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_eval_path_yields_nan_summary_and_metrics_file() {
        let dir = temp_save_dir("nan");
        let summary = train(
            || {
                Ok(StubAgent {
                    iterations_run: 0,
                    eval_every: None,
                })
            },
            1,
            Some(&dir),
            true,
        )
        .expect("train");

        assert!(summary.mean_eval_return.is_nan());

        let metrics_path = dir.join(METRICS_FILE);
        assert!(metrics_path.exists());
        let text = std::fs::read_to_string(&metrics_path).expect("read metrics");
        let reloaded: MetricsSummary = serde_json::from_str(&text).expect("parse metrics");
        assert!(reloaded.mean_eval_return.is_nan());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn keeps_last_extracted_eval_return() {
        let summary = train(
            || {
                Ok(StubAgent {
                    iterations_run: 0,
                    eval_every: Some(2),
                })
            },
            5,
            None,
            true,
        )
        .expect("train");
        // Iterations 2 and 4 carry evaluation blocks; the last one wins.
        assert_eq!(summary.mean_eval_return, 40.0);
    }

    #[test]
    fn training_twice_in_one_process_does_not_double_initialize() {
        let build = || {
            Ok(StubAgent {
                iterations_run: 0,
                eval_every: None,
            })
        };
        train(build, 1, None, true).expect("first run");
        let build = || {
            Ok(StubAgent {
                iterations_run: 0,
                eval_every: None,
            })
        };
        train(build, 1, None, true).expect("second run");
        assert!(runtime::is_initialized());
    }

    #[test]
    fn checkpoint_roundtrip_restores_state() {
        let dir = temp_save_dir("ckpt");
        let agent = StubAgent {
            iterations_run: 9,
            eval_every: None,
        };
        save_checkpoint(&dir, &agent).expect("save");

        let snapshot = load_checkpoint(&dir).expect("load");
        let mut restored = StubAgent {
            iterations_run: 0,
            eval_every: None,
        };
        restored.restore(snapshot).expect("restore");
        assert_eq!(restored.iterations_run, 9);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_checkpoint_from_empty_dir_fails() {
        let dir = temp_save_dir("missing");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let err = load_checkpoint(&dir).expect_err("must fail");
        assert!(matches!(err, CoreError::Checkpoint(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
