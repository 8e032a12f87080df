use anyhow::{Context, Result};
use async_trait::async_trait;
use c3d_core::runner::{RunExit, RunnerPlugin, RunnerSession, RunnerStartArgs};
use std::process::Stdio;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

/// Spawns the configured interpreter as a local child process.
pub struct InterpreterRunnerPlugin {}

impl InterpreterRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for InterpreterRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for InterpreterRunnerPlugin {
    fn name(&self) -> &str {
        "interpreter"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let mut std_cmd = std::process::Command::new(&args.cmd);
        std_cmd
            .args(&args.args)
            .current_dir(&args.cwd)
            .envs(&args.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // own process group, so anything the script forks can be killed with it
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let child = Command::from(std_cmd)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", args.cmd))?;

        tracing::debug!(
            cmd = %args.cmd,
            pid = ?child.id(),
            cwd = %args.cwd.display(),
            "interpreter spawned"
        );
        let pgid = child.id();
        Ok(Box::new(InterpreterSession { child, pgid }))
    }
}

struct InterpreterSession {
    child: Child,
    /// Process group led by the interpreter; cleared once the group is killed
    /// after a normal exit.
    pgid: Option<u32>,
}

impl InterpreterSession {
    #[cfg(unix)]
    fn kill_group(&self) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.pgid else {
            return;
        };
        match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(pgid, error = %e, "failed to kill process group"),
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}
}

impl Drop for InterpreterSession {
    fn drop(&mut self) {
        self.kill_group();
    }
}

#[async_trait]
impl RunnerSession for InterpreterSession {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn start_kill(&mut self) -> Result<()> {
        self.kill_group();
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // already exited and reaped
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn wait(&mut self) -> Result<RunExit> {
        let status = self.child.wait().await?;
        // background jobs must not outlive the interpreter
        self.kill_group();
        self.pgid = None;
        Ok(RunExit {
            code: status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::AsyncReadExt;

    fn sh(script: &str, cwd: &std::path::Path) -> RunnerStartArgs {
        RunnerStartArgs {
            cmd: "sh".into(),
            args: vec!["-c".into(), script.into()],
            cwd: cwd.to_path_buf(),
            envs: HashMap::from([("C3D_TEST_VAR".to_string(), "from-config".to_string())]),
        }
    }

    #[tokio::test]
    async fn runs_in_cwd_with_extra_env() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = InterpreterRunnerPlugin::new();
        let mut session = plugin
            .start_session(&sh("pwd -P; echo $C3D_TEST_VAR", dir.path()))
            .await
            .unwrap();

        let mut out = String::new();
        session
            .stdout()
            .unwrap()
            .read_to_string(&mut out)
            .await
            .unwrap();
        let exit = session.wait().await.unwrap();

        assert!(exit.success());
        let canonical = dir.path().canonicalize().unwrap();
        assert!(out.contains(&*canonical.to_string_lossy()));
        assert!(out.contains("from-config"));
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = InterpreterRunnerPlugin::new()
            .start_session(&sh("exit 3", dir.path()))
            .await
            .unwrap();
        assert_eq!(session.wait().await.unwrap().code, Some(3));
    }

    #[tokio::test]
    async fn killed_process_has_no_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = InterpreterRunnerPlugin::new()
            .start_session(&sh("exec sleep 30", dir.path()))
            .await
            .unwrap();
        session.start_kill().unwrap();
        let exit = session.wait().await.unwrap();
        assert_eq!(exit.code, None);
        assert!(!exit.success());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn kill_reaches_background_children() {
        use tokio::io::AsyncBufReadExt;

        let dir = tempfile::tempdir().unwrap();
        let mut session = InterpreterRunnerPlugin::new()
            .start_session(&sh("sleep 30 &\necho $!\nwait", dir.path()))
            .await
            .unwrap();

        let mut lines = tokio::io::BufReader::new(session.stdout().unwrap()).lines();
        let bg_pid = lines.next_line().await.unwrap().unwrap();
        assert!(running(&bg_pid));

        session.start_kill().unwrap();
        session.wait().await.unwrap();
        assert!(gone_within(&bg_pid, std::time::Duration::from_secs(3)).await);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn normal_exit_reaps_background_children() {
        use tokio::io::AsyncBufReadExt;

        let dir = tempfile::tempdir().unwrap();
        let mut session = InterpreterRunnerPlugin::new()
            .start_session(&sh("sleep 30 >/dev/null 2>&1 &\necho $!", dir.path()))
            .await
            .unwrap();

        let mut lines = tokio::io::BufReader::new(session.stdout().unwrap()).lines();
        let bg_pid = lines.next_line().await.unwrap().unwrap();
        let exit = session.wait().await.unwrap();

        assert!(exit.success());
        assert!(gone_within(&bg_pid, std::time::Duration::from_secs(3)).await);
    }

    /// Alive and not a zombie waiting for its (re)parent to reap it.
    #[cfg(target_os = "linux")]
    fn running(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid.trim())) {
            Ok(stat) => stat
                .rsplit_once(") ")
                .map(|(_, rest)| !rest.starts_with('Z') && !rest.starts_with('X'))
                .unwrap_or(true),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    async fn gone_within(pid: &str, limit: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + limit;
        while std::time::Instant::now() < deadline {
            if !running(pid) {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        !running(pid)
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunnerStartArgs {
            cmd: "c3d-definitely-not-an-interpreter".into(),
            args: vec![],
            cwd: dir.path().to_path_buf(),
            envs: HashMap::new(),
        };
        let err = InterpreterRunnerPlugin::new()
            .start_session(&args)
            .await
            .err()
            .expect("spawn should fail");
        assert!(err.to_string().contains("c3d-definitely-not-an-interpreter"));
    }
}
