//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use advocate_report::ClientConfig;
use anyhow::{Context, Result};

const ENV_CONFIG: &str = "ADVOCATE_REPORT_CONFIG";

/// Resolve the config file path.
///
/// Priority: explicit flag, `ADVOCATE_REPORT_CONFIG`, `./.advocate/report.json`,
/// then `~/.advocate/report.json`.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok();
    resolve_from(
        explicit,
        std::env::var(ENV_CONFIG).ok(),
        Path::new(""),
        home.as_deref(),
    )
}

fn resolve_from(
    explicit: Option<&str>,
    env_path: Option<String>,
    cwd: &Path,
    home: Option<&str>,
) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Some(env_path) = env_path {
        return PathBuf::from(env_path);
    }

    let cwd_config = cwd.join(".advocate").join("report.json");
    if cwd_config.exists() {
        return cwd_config;
    }

    PathBuf::from(home.unwrap_or("."))
        .join(".advocate")
        .join("report.json")
}

/// Load and validate the client config at `path`.
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let config = ClientConfig::load(path)
        .with_context(|| format!("failed to load config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(config)
}
