use std::sync::Arc;

use c3d_core::config::{AppConfig, GatewayConfig};
use c3d_core::gateway::ScriptGateway;
use c3d_core::runner::RunnerPlugin;

use crate::runner::InterpreterRunnerPlugin;

pub fn build_runner(_cfg: &GatewayConfig) -> Arc<dyn RunnerPlugin> {
    Arc::new(InterpreterRunnerPlugin::new())
}

pub fn build_gateway(cfg: &AppConfig) -> ScriptGateway {
    ScriptGateway::new(cfg.gateway.clone(), build_runner(&cfg.gateway))
}
