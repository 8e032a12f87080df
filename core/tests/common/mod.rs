use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use c3d_core::api::{
    GatewayConfig, RetentionPolicy, RunExit, RunnerPlugin, RunnerSession, RunnerStartArgs,
};
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream};
use tokio::sync::watch;

/// What the fake "interpreter" does once started.
#[derive(Clone, Debug)]
pub enum Behavior {
    Exit {
        code: Option<i32>,
        stdout: &'static str,
        stderr: &'static str,
        /// Files created in the working directory before exiting.
        files: Vec<&'static str>,
    },
    /// Writes `stdout`, then blocks until killed.
    Hang { stdout: &'static str },
    SpawnError,
}

#[derive(Clone, Debug)]
pub struct Seen {
    pub args: RunnerStartArgs,
    pub script: String,
}

pub struct FakeRunner {
    behavior: Behavior,
    pub killed: Arc<AtomicBool>,
    pub dropped: Arc<AtomicBool>,
    pub seen: Arc<Mutex<Option<Seen>>>,
}

impl FakeRunner {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            killed: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicBool::new(false)),
            seen: Arc::new(Mutex::new(None)),
        })
    }

    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// The session was released, which is when a real runner reaps its process.
    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Option<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn pipe_with(data: &str) -> (DuplexStream, DuplexStream) {
    let (mut w, r) = tokio::io::duplex(64 * 1024);
    w.write_all(data.as_bytes()).await.unwrap();
    (w, r)
}

#[async_trait]
impl RunnerPlugin for FakeRunner {
    fn name(&self) -> &str {
        "fake"
    }

    async fn start_session(
        &self,
        args: &RunnerStartArgs,
    ) -> anyhow::Result<Box<dyn RunnerSession>> {
        let script = std::fs::read_to_string(&args.args[0]).unwrap_or_default();
        *self.seen.lock().unwrap() = Some(Seen {
            args: args.clone(),
            script,
        });

        let (kill_tx, kill_rx) = watch::channel(false);
        match &self.behavior {
            Behavior::SpawnError => anyhow::bail!("No such file or directory (os error 2)"),
            Behavior::Exit {
                code,
                stdout,
                stderr,
                files,
            } => {
                for f in files {
                    let p = args.cwd.join(f);
                    if let Some(parent) = p.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(p, b"solid fake\nendsolid fake\n")?;
                }
                let (_w_out, r_out) = pipe_with(stdout).await;
                let (_w_err, r_err) = pipe_with(stderr).await;
                Ok(Box::new(FakeSession {
                    stdout: Some(r_out),
                    stderr: Some(r_err),
                    hold: vec![],
                    exit: *code,
                    hang: false,
                    killed: self.killed.clone(),
                    dropped: self.dropped.clone(),
                    kill_tx,
                    kill_rx,
                }))
            }
            Behavior::Hang { stdout } => {
                let (w_out, r_out) = pipe_with(stdout).await;
                let (w_err, r_err) = pipe_with("").await;
                Ok(Box::new(FakeSession {
                    stdout: Some(r_out),
                    stderr: Some(r_err),
                    hold: vec![w_out, w_err],
                    exit: None,
                    hang: true,
                    killed: self.killed.clone(),
                    dropped: self.dropped.clone(),
                    kill_tx,
                    kill_rx,
                }))
            }
        }
    }
}

struct FakeSession {
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    /// Write halves kept open while the fake process "runs".
    hold: Vec<DuplexStream>,
    exit: Option<i32>,
    hang: bool,
    killed: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
    kill_tx: watch::Sender<bool>,
    kill_rx: watch::Receiver<bool>,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RunnerSession for FakeSession {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn start_kill(&mut self) -> anyhow::Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        let _ = self.kill_tx.send(true);
        Ok(())
    }

    async fn wait(&mut self) -> anyhow::Result<RunExit> {
        if self.hang {
            while !*self.kill_rx.borrow() {
                self.kill_rx.changed().await?;
            }
            self.hold.clear();
            return Ok(RunExit { code: None });
        }
        Ok(RunExit { code: self.exit })
    }
}

pub fn gateway_config(root: &Path, retention: RetentionPolicy) -> GatewayConfig {
    GatewayConfig {
        temp_root: Some(root.to_string_lossy().into_owned()),
        retention,
        kill_grace_ms: 500,
        ..GatewayConfig::default()
    }
}

pub fn entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}
