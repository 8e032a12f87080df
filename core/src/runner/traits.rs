use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::types::{RunExit, RunnerStartArgs};

#[async_trait]
pub trait RunnerSession: Send {
    /// OS process id, if the session is backed by one that is still alive.
    fn id(&self) -> Option<u32>;
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    /// Request forceful termination. Does not wait for the process to exit.
    fn start_kill(&mut self) -> anyhow::Result<()>;
    async fn wait(&mut self) -> anyhow::Result<RunExit>;
}

#[async_trait]
pub trait RunnerPlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, args: &RunnerStartArgs)
        -> anyhow::Result<Box<dyn RunnerSession>>;
}
