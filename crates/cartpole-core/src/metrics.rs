//! Training metrics summary and best-effort metric extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File name of the metrics summary written next to a checkpoint.
pub const METRICS_FILE: &str = "training_metrics.json";

/// Small summary written alongside a persisted agent.
///
/// `mean_eval_return` uses NaN as the "never observed" sentinel: a run whose
/// iterations produced no evaluation block ends with NaN here. JSON cannot
/// carry NaN, so it round-trips as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    #[serde(with = "nan_as_null")]
    pub mean_eval_return: f32,
}

/// Best-effort lookup of `evaluation.env_runners.episode_return_mean` in an
/// iteration report. Absent paths are not an error; callers keep their
/// previous value.
#[must_use]
pub fn try_extract_eval_return(report: &Value) -> Option<f32> {
    report
        .get("evaluation")?
        .get("env_runners")?
        .get("episode_return_mean")?
        .as_f64()
        .map(|v| v as f32)
}

/// serde adapter mapping NaN to JSON `null` and back.
///
/// serde_json refuses to emit NaN floats, so the sentinel needs an explicit
/// wire representation.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::NAN))
    }
}
