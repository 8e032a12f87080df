use crate::config::GatewayConfig;
use crate::error::GatewayError;

use super::types::ExecutionRequest;

/// Check a request against the gateway limits and resolve its timeout.
///
/// Returns the effective timeout in seconds: the requested value (or the
/// configured default) clamped to `max_timeout_secs`.
pub fn validate_request(
    req: &ExecutionRequest,
    cfg: &GatewayConfig,
) -> Result<u64, GatewayError> {
    if req.script.trim().is_empty() {
        return Err(GatewayError::Validation("script cannot be empty".to_string()));
    }
    if req.script.len() > cfg.max_script_bytes {
        return Err(GatewayError::Validation(format!(
            "script too large ({} bytes, max {})",
            req.script.len(),
            cfg.max_script_bytes
        )));
    }

    if let Some(name) = req.output_filename.as_deref() {
        validate_output_filename(name)?;
    }

    let requested = req.timeout_secs.unwrap_or(cfg.default_timeout_secs);
    if requested == 0 {
        return Err(GatewayError::Validation(
            "timeout_secs must be a positive integer".to_string(),
        ));
    }
    let max = cfg.max_timeout_secs.max(1);
    if requested > max {
        tracing::debug!(requested, max, "clamping timeout to configured maximum");
    }
    Ok(requested.min(max))
}

/// `output_filename` must name a file directly inside the working directory.
fn validate_output_filename(name: &str) -> Result<(), GatewayError> {
    if name.is_empty() {
        return Err(GatewayError::Validation(
            "output_filename cannot be empty".to_string(),
        ));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(GatewayError::Validation(format!(
            "output_filename must be a plain file name, got {name:?}"
        )));
    }
    Ok(())
}
