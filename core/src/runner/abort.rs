use std::time::Duration;

use super::traits::RunnerSession;
use super::types::RunExit;

/// Kill the session and wait at most `grace` for it to be reaped.
///
/// Returns the exit status when the process was reaped within the grace period.
pub async fn kill_and_reap(
    session: &mut Box<dyn RunnerSession>,
    grace: Duration,
) -> Option<RunExit> {
    let pid = session.id();
    if let Err(e) = session.start_kill() {
        tracing::warn!(pid = ?pid, error = %e, "kill request failed");
    }

    match tokio::time::timeout(grace, session.wait()).await {
        Ok(Ok(exit)) => {
            tracing::debug!(pid = ?pid, code = ?exit.code, "killed process reaped");
            Some(exit)
        }
        Ok(Err(e)) => {
            tracing::warn!(pid = ?pid, error = %e, "waiting for killed process failed");
            None
        }
        Err(_) => {
            tracing::error!(
                pid = ?pid,
                grace_ms = grace.as_millis() as u64,
                "killed process was not reaped within grace period"
            );
            None
        }
    }
}
