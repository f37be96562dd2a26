use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::MARKDOWN_SUFFIX;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub slack: SlackConfig,
    #[serde(default)]
    pub wikis: WikisConfig,
    /// Wiki directory name -> channel name
    #[serde(default)]
    pub notify_to: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct SlackConfig {
    /// Bot token; `$VAR` / `${VAR}` are expanded from the environment
    pub api_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WikisConfig {
    /// Directory holding one clone per wiki, relative to the config file
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_markdown_suffix")]
    pub markdown_suffix: String,
}

impl Default for WikisConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            branch: default_branch(),
            remote: default_remote(),
            poll_interval_secs: default_poll_interval(),
            markdown_suffix: default_markdown_suffix(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("wikis")
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_poll_interval() -> u64 {
    5 * 60
}

fn default_markdown_suffix() -> String {
    MARKDOWN_SUFFIX.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::parse(&content)?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve(base_dir)?;
        config.validate()?;

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config file")
    }

    /// Expand environment variables and anchor the wiki root
    fn resolve(&mut self, base_dir: &Path) -> Result<()> {
        self.slack.api_token = shellexpand::env(&self.slack.api_token)
            .with_context(|| "Failed to expand slack.api_token")?
            .into_owned();

        let root = self.wikis.root.to_string_lossy().to_string();
        let expanded = shellexpand::full(&root)
            .with_context(|| format!("Failed to expand wikis.root: {}", root))?;
        let expanded = PathBuf::from(expanded.into_owned());
        self.wikis.root = if expanded.is_absolute() {
            expanded
        } else {
            base_dir.join(expanded)
        };

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.slack.api_token.trim().is_empty() {
            anyhow::bail!("slack.api_token is empty");
        }

        if self.notify_to.is_empty() {
            anyhow::bail!("notify_to does not map any wiki to a channel");
        }

        for (wiki, channel) in &self.notify_to {
            if channel.trim().is_empty() {
                anyhow::bail!("Wiki '{}' is mapped to an empty channel name", wiki);
            }
        }

        if self.wikis.poll_interval_secs == 0 {
            anyhow::bail!("wikis.poll_interval_secs must be positive");
        }

        if self.wikis.markdown_suffix.is_empty() {
            anyhow::bail!("wikis.markdown_suffix is empty");
        }

        Ok(())
    }

    pub fn channel_for(&self, wiki: &str) -> Option<&str> {
        self.notify_to.get(wiki).map(|s| s.as_str())
    }
}
