mod abort;
mod io_pump;
mod traits;
pub mod types;

pub use abort::kill_and_reap;
pub use io_pump::{drain, pump_stderr, pump_stdout};
pub use traits::{RunnerPlugin, RunnerSession};
pub use types::{RunExit, RunnerStartArgs};
