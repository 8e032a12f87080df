use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{GatewayConfig, RetentionPolicy};
use crate::error::GatewayError;
use crate::runner::{self, RunnerPlugin, RunnerStartArgs};
use crate::util::RingBytes;

use super::discover::discover_outputs;
use super::types::{ExecutionOutcome, ExecutionRequest, ExecutionResult};
use super::validate::validate_request;
use super::workdir::WorkDir;

/// Runs submitted scripts in isolated working directories.
///
/// Each call to [`ScriptGateway::execute`] owns its own directory, child
/// process and capture buffers; the gateway itself holds no per-request state
/// and can be shared freely across tasks.
#[derive(Clone)]
pub struct ScriptGateway {
    cfg: Arc<GatewayConfig>,
    temp_root: PathBuf,
    runner: Arc<dyn RunnerPlugin>,
}

impl ScriptGateway {
    pub fn new(cfg: GatewayConfig, runner: Arc<dyn RunnerPlugin>) -> Self {
        let temp_root = cfg.temp_root_path();
        Self {
            cfg: Arc::new(cfg),
            temp_root,
            runner,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.cfg
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    #[tracing::instrument(name = "gateway.execute", skip_all, fields(runner = %self.runner.name()))]
    pub async fn execute(&self, req: ExecutionRequest) -> Result<ExecutionOutcome, GatewayError> {
        let timeout_secs = validate_request(&req, &self.cfg)?;

        // Dropped (and removed synchronously) only if this future is cancelled.
        let workdir = WorkDir::create(&self.temp_root, &self.cfg.workdir_prefix).await?;
        let result = self.run_in(&workdir, &req, timeout_secs).await;

        match result {
            Ok(ExecutionOutcome::Success(mut res))
                if self.cfg.retention == RetentionPolicy::Retain =>
            {
                res.workdir = workdir.keep();
                Ok(ExecutionOutcome::Success(res))
            }
            other => {
                workdir.discard().await;
                other
            }
        }
    }

    async fn run_in(
        &self,
        workdir: &WorkDir,
        req: &ExecutionRequest,
        timeout_secs: u64,
    ) -> Result<ExecutionOutcome, GatewayError> {
        let grace = Duration::from_millis(self.cfg.kill_grace_ms);
        let script_path = workdir.path().join(&self.cfg.script_filename);
        tokio::fs::write(&script_path, req.script.as_bytes())
            .await
            .map_err(|e| GatewayError::Workdir {
                path: script_path.clone(),
                source: e,
            })?;

        let start_args = RunnerStartArgs {
            cmd: self.cfg.interpreter.clone(),
            args: vec![script_path.to_string_lossy().into_owned()],
            cwd: workdir.path().to_path_buf(),
            envs: self.cfg.env.clone(),
        };

        let started = Instant::now();
        let mut session = self
            .runner
            .start_session(&start_args)
            .await
            .map_err(|e| GatewayError::Spawn(format!("{}: {e:#}", self.cfg.interpreter)))?;
        tracing::info!(
            workdir = %workdir.name(),
            pid = ?session.id(),
            timeout_secs,
            "script started"
        );

        let stdout_ring = RingBytes::new(self.cfg.capture_bytes);
        let stderr_ring = RingBytes::new(self.cfg.capture_bytes);
        let mut pumps = Vec::with_capacity(2);
        if let Some(out) = session.stdout() {
            pumps.push(runner::pump_stdout(out, stdout_ring.clone()));
        }
        if let Some(err) = session.stderr() {
            pumps.push(runner::pump_stderr(err, stderr_ring.clone()));
        }

        let waited =
            tokio::time::timeout(Duration::from_secs(timeout_secs), session.wait()).await;

        let exit = match waited {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => {
                runner::kill_and_reap(&mut session, grace).await;
                let _ = runner::drain(pumps, grace).await;
                return Err(GatewayError::Spawn(format!("wait for interpreter failed: {e:#}")));
            }
            Err(_) => {
                tracing::warn!(timeout_secs, "script exceeded time budget, killing interpreter");
                runner::kill_and_reap(&mut session, grace).await;
                if let Err(e) = runner::drain(pumps, grace).await {
                    tracing::warn!(error = %e, "output capture failed after timeout");
                }
                return Ok(ExecutionOutcome::Timeout {
                    timeout_secs,
                    stdout: stdout_ring.to_string_lossy(),
                    stderr: stderr_ring.to_string_lossy(),
                });
            }
        };

        runner::drain(pumps, grace).await?;
        // Background processes the script left behind go with it.
        drop(session);
        let stdout = stdout_ring.to_string_lossy();
        let stderr = stderr_ring.to_string_lossy();
        let duration_ms = started.elapsed().as_millis() as u64;

        if !exit.success() {
            tracing::info!(exit_code = ?exit.code, duration_ms, "script failed");
            return Ok(ExecutionOutcome::ScriptFailed {
                stdout,
                stderr,
                exit_code: exit.code,
            });
        }

        let output_paths = self.scan_outputs(workdir, req.output_filename.clone()).await?;
        if output_paths.is_empty() {
            tracing::info!(duration_ms, "script exited cleanly without recognized output");
            return Ok(ExecutionOutcome::NoOutputProduced { stdout, stderr });
        }

        let files = relative_files(workdir, &output_paths);
        tracing::info!(outputs = output_paths.len(), duration_ms, "script succeeded");

        Ok(ExecutionOutcome::Success(ExecutionResult {
            output_paths,
            files,
            stdout,
            stderr,
            workdir: workdir.path().to_path_buf(),
            duration_ms,
        }))
    }

    async fn scan_outputs(
        &self,
        workdir: &WorkDir,
        output_filename: Option<String>,
    ) -> Result<Vec<PathBuf>, GatewayError> {
        let scan_dir = workdir.path().to_path_buf();
        let extensions = self.cfg.output_extensions.clone();
        let budget = Duration::from_millis(self.cfg.scan_timeout_ms);
        let scan = tokio::task::spawn_blocking(move || {
            discover_outputs(&scan_dir, &extensions, output_filename.as_deref())
        });

        match tokio::time::timeout(budget, scan).await {
            Ok(joined) => joined.map_err(|e| GatewayError::Io(std::io::Error::other(e)))?,
            Err(_) => {
                tracing::error!(budget_ms = self.cfg.scan_timeout_ms, "output scan timed out");
                Err(GatewayError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("output scan exceeded {}ms", self.cfg.scan_timeout_ms),
                )))
            }
        }
    }
}

/// Output paths relative to the temp root (`<workdir name>/<file>`).
fn relative_files(workdir: &WorkDir, outputs: &[PathBuf]) -> Vec<String> {
    let name = workdir.name();
    outputs
        .iter()
        .filter_map(|p| p.strip_prefix(workdir.path()).ok())
        .map(|rel| {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            format!("{name}/{rel}")
        })
        .collect()
}
