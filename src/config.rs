use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_NAME: &str = "application";

#[derive(Deserialize, Clone, Debug)]
pub struct ConfigFile {
    pub verbose: Option<bool>,
    /// Seconds between re-checks of the target while no events arrive
    pub poll_interval: Option<u64>,
    #[serde(rename = "emailSettings")]
    pub email: EmailSettings,
}

impl ConfigFile {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// SMTP account and addressing used for notifications
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub port: u16,
    #[serde(alias = "emailto")]
    pub email_to: String,
    #[serde(alias = "emailfrom")]
    pub email_from: String,
}

/// Finds the config file for `name`.
///
/// `name` may point straight at a file. Otherwise `<home>/<name>.toml`,
/// `<home>/<name>.json` and `<home>/<name>.conf` are tried in that order.
/// `.conf` files are read as TOML.
pub fn locate(name: &str, home: &Path) -> Result<PathBuf> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    ["toml", "json", "conf"]
        .iter()
        .map(|ext| home.join(format!("{}.{}", name, ext)))
        .find(|candidate| candidate.is_file())
        .with_context(|| {
            format!(
                "No configuration named '{}' found in {}",
                name,
                home.display()
            )
        })
}

pub fn load_config(file_path: &Path) -> Result<ConfigFile> {
    let config_str = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read config file {}", file_path.display()))?;

    let is_json = file_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config: ConfigFile = if is_json {
        serde_json::from_str(&config_str).context("Failed to parse config file")?
    } else {
        toml::from_str(&config_str).context("Failed to parse config file")?
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    let email = &config.email;
    if email.host.trim().is_empty() {
        anyhow::bail!("emailSettings.host must not be empty");
    }
    if email.port == 0 {
        anyhow::bail!("emailSettings.port must not be 0");
    }
    if email.email_to.trim().is_empty() {
        anyhow::bail!("emailSettings.emailTo must not be empty");
    }
    if email.email_from.trim().is_empty() {
        anyhow::bail!("emailSettings.emailFrom must not be empty");
    }
    Ok(())
}
