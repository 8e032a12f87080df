mod discover;
mod execute;
mod library;
mod sweep;
pub mod types;
mod validate;
mod workdir;

pub use discover::discover_outputs;
pub use execute::ScriptGateway;
pub use library::{import_local_stl, LibraryImport, LIBRARY_PREFIX};
pub use sweep::{spawn_sweeper, sweep_expired};
pub use types::{ExecutionOutcome, ExecutionRequest, ExecutionResult};
pub use validate::validate_request;
pub use workdir::WorkDir;
