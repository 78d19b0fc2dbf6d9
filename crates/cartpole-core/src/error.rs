use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Snapshot deserialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    #[error("Unknown environment id: {0}")]
    UnknownEnv(String),
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
    #[error("Agent failure: {0}")]
    Agent(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
