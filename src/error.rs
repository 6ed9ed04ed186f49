use thiserror::Error;

/// Failures surfaced by the pipeline.
///
/// Only `UnsupportedTool`, `InstallFailed` and `InvalidInput` stop a run;
/// everything a collaborator does wrong at scan time is logged by the stage
/// that saw it and the run carries on with whatever data exists.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is not installed or not on PATH")]
    ToolMissing(String),
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolExecution {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("unsupported tool: {0}")]
    UnsupportedTool(String),
    #[error("failed to install {tool}: {reason}")]
    InstallFailed { tool: String, reason: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
