//! HTTP API数据模型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use c3d_core::api::{ExecutionOutcome, ExecutionResult, GatewayError, LibraryImport};
use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "1.0.0";

// ============= Render =============

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub script: String,
    #[serde(default)]
    pub output_filename: Option<String>,
    /// 有符号类型，以便对负数给出明确的校验错误
    #[serde(default)]
    pub timeout_secs: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub success: bool,
    pub output_paths: Vec<String>,
    /// 相对于临时根目录的路径，可通过 `/files/<path>` 下载
    pub files: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub workdir: String,
    pub duration_ms: u64,
}

impl From<ExecutionResult> for RenderResponse {
    fn from(r: ExecutionResult) -> Self {
        Self {
            success: true,
            output_paths: r
                .output_paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            files: r.files,
            stdout: r.stdout,
            stderr: r.stderr,
            workdir: r.workdir.to_string_lossy().into_owned(),
            duration_ms: r.duration_ms,
        }
    }
}

// ============= Load STL =============

#[derive(Debug, Deserialize)]
pub struct LoadStlQuery {
    pub file_path: String,
}

#[derive(Debug, Serialize)]
pub struct LoadStlResponse {
    pub success: bool,
    pub temp_filename: String,
    pub original_path: String,
    pub size: u64,
}

impl From<LibraryImport> for LoadStlResponse {
    fn from(i: LibraryImport) -> Self {
        Self {
            success: true,
            temp_filename: i.temp_filename,
            original_path: i.original_path.to_string_lossy().into_owned(),
            size: i.size,
        }
    }
}

// ============= Health =============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub frontend_available: bool,
    pub api_version: String,
    pub uptime_seconds: f64,
    pub requests_handled: u64,
    pub timestamp: String,
}

// ============= Error Handling =============

#[derive(Debug)]
pub enum HttpServerError {
    InvalidRequest(String),
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
    NoOutput {
        stdout: String,
        stderr: String,
    },
    NotFound(String),
    Internal(String),
}

impl HttpServerError {
    /// 将非成功的执行结果映射为HTTP错误
    pub fn from_outcome(outcome: ExecutionOutcome) -> Option<Self> {
        match outcome {
            ExecutionOutcome::Success(_) => None,
            ExecutionOutcome::ScriptFailed {
                stdout,
                stderr,
                exit_code,
            } => Some(Self::ScriptFailed {
                stdout,
                stderr,
                exit_code,
            }),
            ExecutionOutcome::Timeout {
                timeout_secs,
                stdout,
                stderr,
            } => Some(Self::Timeout {
                timeout_secs,
                stdout,
                stderr,
            }),
            ExecutionOutcome::NoOutputProduced { stdout, stderr } => {
                Some(Self::NoOutput { stdout, stderr })
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::ScriptFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NoOutput { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for HttpServerError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(msg) => Self::InvalidRequest(msg),
            GatewayError::NotFound(msg) => Self::NotFound(msg),
            other => {
                tracing::error!(error = %other, "gateway internal error");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::InvalidRequest(msg) => serde_json::json!({
                "success": false,
                "error": msg,
                "error_code": "INVALID_REQUEST",
            }),
            Self::ScriptFailed {
                stdout,
                stderr,
                exit_code,
            } => serde_json::json!({
                "success": false,
                "error": format!("Script failed: {}", stderr.trim_end()),
                "error_code": "SCRIPT_FAILED",
                "stdout": stdout,
                "stderr": stderr,
                "exit_code": exit_code,
            }),
            Self::Timeout {
                timeout_secs,
                stdout,
                stderr,
            } => serde_json::json!({
                "success": false,
                "error": format!("Script execution timed out after {timeout_secs}s"),
                "error_code": "TIMEOUT",
                "stdout": stdout,
                "stderr": stderr,
            }),
            Self::NoOutput { stdout, stderr } => serde_json::json!({
                "success": false,
                "error": "No output files generated",
                "error_code": "NO_OUTPUT",
                "stdout": stdout,
                "stderr": stderr,
            }),
            Self::NotFound(msg) => serde_json::json!({
                "success": false,
                "error": msg,
                "error_code": "NOT_FOUND",
            }),
            Self::Internal(msg) => serde_json::json!({
                "success": false,
                "error": msg,
                "error_code": "INTERNAL_ERROR",
            }),
        };

        (status, Json(body)).into_response()
    }
}
