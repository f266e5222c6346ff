//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ratebot.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".ratebot.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Ratings file settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Announcement settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Access settings.
    #[serde(default)]
    pub access: AccessConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Where the ratings document lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the ratings JSON file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("json/ratings.json")
}

/// Announcement channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Channel new submissions are announced in.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Webhook URL of that channel. Announcements are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Guild ID, used to link to posted announcements.
    #[serde(default)]
    pub guild_id: Option<String>,

    /// Webhook request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            webhook_url: None,
            guild_id: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_channel() -> String {
    "music-ratings".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// Who may do what.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Identities that may not drop submissions.
    #[serde(default)]
    pub drop_deny: Vec<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, and only
    /// when they were given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref path) = args.store {
            self.store.path = path.clone();
        }
        if let Some(ref url) = args.webhook_url {
            self.notify.webhook_url = Some(url.clone());
        }
        if let Some(ref channel) = args.channel {
            self.notify.channel = channel.clone();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.path, PathBuf::from("json/ratings.json"));
        assert_eq!(config.notify.channel, "music-ratings");
        assert!(config.notify.webhook_url.is_none());
        assert!(config.access.drop_deny.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[store]
path = "/var/lib/ratebot/ratings.json"

[notify]
channel = "song-reviews"
webhook_url = "https://discord.com/api/webhooks/1/abc"

[access]
drop_deny = ["mallory", "trudy"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/ratebot/ratings.json")
        );
        assert_eq!(config.notify.channel, "song-reviews");
        assert_eq!(config.notify.timeout_seconds, 10);
        assert_eq!(config.access.drop_deny, vec!["mallory", "trudy"]);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let args = Args::parse_from([
            "ratebot",
            "--store",
            "other.json",
            "--channel",
            "reviews",
            "pending",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.store.path, PathBuf::from("other.json"));
        assert_eq!(config.notify.channel, "reviews");
        assert!(config.notify.webhook_url.is_none());
    }

    #[test]
    fn test_verbose_config_raises_log_level() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = Args::parse_from(["ratebot", "pending"]);
        config.merge_with_args(&args);

        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        let quiet = Args::parse_from(["ratebot", "--quiet", "pending"]);
        assert_eq!(quiet.log_level(config.general.verbose), tracing::Level::ERROR);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[notify]"));
        assert!(toml_str.contains("[access]"));
    }
}
