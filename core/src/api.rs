//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `c3d_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from, AppConfig, FrontendConfig, GatewayConfig, LoggingConfig,
    RetentionPolicy, ServerConfig,
};
pub use crate::error::{CliError, GatewayError};
pub use crate::gateway::{
    import_local_stl, spawn_sweeper, sweep_expired, ExecutionOutcome, ExecutionRequest,
    ExecutionResult, LibraryImport, ScriptGateway, LIBRARY_PREFIX,
};
pub use crate::runner::{RunExit, RunnerPlugin, RunnerSession, RunnerStartArgs};
