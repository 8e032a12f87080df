use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub script: String,
    #[serde(default)]
    pub output_filename: Option<String>,
    /// Falls back to the configured default when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ExecutionRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            output_filename: None,
            timeout_secs: None,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Absolute paths, ordered by extension priority then name. Never empty.
    pub output_paths: Vec<PathBuf>,
    /// Same outputs relative to the temp root, `/`-separated.
    pub files: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub workdir: PathBuf,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success(ExecutionResult),
    ScriptFailed {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    Timeout {
        timeout_secs: u64,
        stdout: String,
        stderr: String,
    },
    NoOutputProduced {
        stdout: String,
        stderr: String,
    },
}

impl ExecutionOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::ScriptFailed { .. } => "script_failed",
            Self::Timeout { .. } => "timeout",
            Self::NoOutputProduced { .. } => "no_output_produced",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn stdout(&self) -> &str {
        match self {
            Self::Success(r) => &r.stdout,
            Self::ScriptFailed { stdout, .. }
            | Self::Timeout { stdout, .. }
            | Self::NoOutputProduced { stdout, .. } => stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            Self::Success(r) => &r.stderr,
            Self::ScriptFailed { stderr, .. }
            | Self::Timeout { stderr, .. }
            | Self::NoOutputProduced { stderr, .. } => stderr,
        }
    }
}
