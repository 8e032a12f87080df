use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "c3d_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// First port tried when neither `PORT` nor `--port` is given.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of consecutive ports tried starting at `port`.
    #[serde(default = "default_port_scan_span")]
    pub port_scan_span: u16,

    /// Added on top of `gateway.max_timeout_secs` for the HTTP request timeout.
    #[serde(default = "default_request_timeout_margin_secs")]
    pub request_timeout_margin_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_port_scan_span() -> u16 {
    100
}

fn default_request_timeout_margin_secs() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_scan_span: default_port_scan_span(),
            request_timeout_margin_secs: default_request_timeout_margin_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Remove the working directory as soon as the result is built.
    Delete,
    /// Keep successful working directories until `retain_ttl_secs` elapses.
    Retain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Interpreter binary invoked with the script path as its only argument.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    #[serde(default = "default_script_filename")]
    pub script_filename: String,

    /// Parent of all working directories. OS temp dir + `c3d` when unset.
    #[serde(default)]
    pub temp_root: Option<String>,

    #[serde(default = "default_workdir_prefix")]
    pub workdir_prefix: String,

    /// Recognized output extensions, lowercase, highest priority first.
    #[serde(default = "default_output_extensions")]
    pub output_extensions: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// Upper bound for the post-run output scan.
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,

    /// Tail kept per captured stream.
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,

    #[serde(default = "default_max_script_bytes")]
    pub max_script_bytes: usize,

    #[serde(default = "default_retention")]
    pub retention: RetentionPolicy,

    #[serde(default = "default_retain_ttl_secs")]
    pub retain_ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Extra environment passed to the interpreter on top of the inherited one.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_script_filename() -> String {
    "model.py".to_string()
}

fn default_workdir_prefix() -> String {
    "cadquery_".to_string()
}

fn default_output_extensions() -> Vec<String> {
    ["stl", "step", "stp", "obj", "3mf"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_timeout_secs() -> u64 {
    600
}

fn default_kill_grace_ms() -> u64 {
    2_000
}

fn default_scan_timeout_ms() -> u64 {
    10_000
}

fn default_capture_bytes() -> usize {
    1024 * 1024
}

fn default_max_script_bytes() -> usize {
    1024 * 1024
}

fn default_retention() -> RetentionPolicy {
    RetentionPolicy::Retain
}

fn default_retain_ttl_secs() -> u64 {
    3_600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script_filename: default_script_filename(),
            temp_root: None,
            workdir_prefix: default_workdir_prefix(),
            output_extensions: default_output_extensions(),
            default_timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            kill_grace_ms: default_kill_grace_ms(),
            scan_timeout_ms: default_scan_timeout_ms(),
            capture_bytes: default_capture_bytes(),
            max_script_bytes: default_max_script_bytes(),
            retention: default_retention(),
            retain_ttl_secs: default_retain_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            env: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    pub fn temp_root_path(&self) -> PathBuf {
        match self
            .temp_root
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("c3d"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Directory holding the prebuilt frontend (`index.html`, `assets/`).
    #[serde(default)]
    pub dir: Option<String>,
}

impl FrontendConfig {
    pub fn dir_path(&self) -> Option<PathBuf> {
        self.dir
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8765);
        assert_eq!(cfg.gateway.interpreter, "python3");
        assert_eq!(cfg.gateway.default_timeout_secs, 60);
        assert_eq!(cfg.gateway.retention, RetentionPolicy::Retain);
        assert_eq!(
            cfg.gateway.output_extensions,
            vec!["stl", "step", "stp", "obj", "3mf"]
        );
        assert!(cfg.frontend.dir_path().is_none());
    }

    #[test]
    fn partial_gateway_section_keeps_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [gateway]
            interpreter = "/opt/cq/bin/python"
            retention = "delete"

            [gateway.env]
            CQ_LOG = "1"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gateway.interpreter, "/opt/cq/bin/python");
        assert_eq!(cfg.gateway.retention, RetentionPolicy::Delete);
        assert_eq!(cfg.gateway.env.get("CQ_LOG").map(String::as_str), Some("1"));
        assert_eq!(cfg.gateway.script_filename, "model.py");
        assert_eq!(cfg.gateway.kill_grace_ms, 2_000);
        assert_eq!(cfg.gateway.scan_timeout_ms, 10_000);
    }

    #[test]
    fn blank_temp_root_falls_back_to_os_temp() {
        let gw = GatewayConfig {
            temp_root: Some("  ".into()),
            ..GatewayConfig::default()
        };
        assert_eq!(gw.temp_root_path(), std::env::temp_dir().join("c3d"));
    }
}
