use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunnerStartArgs {
    pub cmd: String,
    pub args: Vec<String>,
    /// Working directory of the child.
    pub cwd: PathBuf,
    /// Added on top of the inherited parent environment.
    pub envs: HashMap<String, String>,
}

/// How a runner session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RunExit {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl RunExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}
