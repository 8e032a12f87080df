use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default c3d data directory: ~/.c3d
pub fn get_c3d_data_dir() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".c3d"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    load_from(None)
}

/// Load configuration, preferring `explicit` when given.
///
/// Lookup order without an explicit path: `~/.c3d/config.toml`, then
/// `./config.toml`, then built-in defaults. Environment overrides are applied last.
pub fn load_from(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let c3d_dir = get_c3d_data_dir()?;
    let c3d_config = c3d_dir.join("config.toml");
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if let Some(path) = explicit {
        read_toml(path)?
    } else if c3d_config.exists() {
        read_toml(&c3d_config)?
    } else if local_config.exists() {
        read_toml(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg.logging.file
        && cfg
            .logging
            .directory
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    {
        let logs_dir = c3d_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

fn read_toml(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {} failed: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse config {} failed: {e}", path.display()))?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
pub(crate) fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("C3D_INTERPRETER") {
        cfg.gateway.interpreter = v;
    }
    if let Some(v) = non_empty("C3D_TEMP_ROOT") {
        cfg.gateway.temp_root = Some(v);
    }
    if let Some(v) = non_empty("C3D_FRONTEND_DIR") {
        cfg.frontend.dir = Some(v);
    }
}
