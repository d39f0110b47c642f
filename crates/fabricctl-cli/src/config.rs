use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ProfileConfig {
    pub host: Option<String>,
    pub format: Option<String>,
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

fn config_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".fabricctl");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)?;
    let cfg: ConfigFile = toml::from_str(&content)?;
    Ok(cfg)
}

fn save_all_to(path: &Path, all: &ConfigFile) -> Result<()> {
    let content = toml::to_string_pretty(all)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    let all = load_all_from(&config_path()?)?;
    Ok(all
        .into_iter()
        .find(|(k, _)| k == profile)
        .map(|(_, v)| v)
        .unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    let path = config_path()?;
    let mut all = load_all_from(&path)?;
    all.insert(
        profile.to_string(),
        ProfileConfig {
            host: config.host.clone(),
            format: config.format.clone(),
        },
    );
    save_all_to(&path, &all)
}

/// Host resolution order: the --host flag (or FABRICCTL_HOST), the profile in
/// config.toml, then the host recorded with stored credentials.
pub fn resolve_host(cli_host: &Option<String>, profile: &str) -> Result<String> {
    if let Some(host) = cli_host {
        fabricctl_client::validate_base_url(host)?;
        return Ok(host.clone());
    }
    let cfg = load_profile(profile)?;
    if let Some(host) = cfg.host {
        fabricctl_client::validate_base_url(&host)?;
        return Ok(host);
    }
    if let Ok(Some(creds)) = crate::auth::load_credentials(profile) {
        return Ok(creds.host);
    }
    anyhow::bail!(
        "No orchestrator URL configured. Use --host, set FABRICCTL_HOST, or run: fabricctl login --host <url>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut all = ConfigFile::new();
        all.insert(
            "default".to_string(),
            ProfileConfig {
                host: Some("https://orch.example.com".to_string()),
                format: Some("table".to_string()),
            },
        );
        all.insert("lab".to_string(), ProfileConfig::default());
        save_all_to(&path, &all).unwrap();

        let loaded = load_all_from(&path).unwrap();
        assert_eq!(
            loaded["default"].host.as_deref(),
            Some("https://orch.example.com")
        );
        assert!(loaded["lab"].host.is_none());
    }

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_all_from(&dir.path().join("missing.toml")).unwrap();
        assert!(loaded.is_empty());
    }
}
