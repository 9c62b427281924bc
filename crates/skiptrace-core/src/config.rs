use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = ".skiptrace.toml";

/// Top-level configuration from `.skiptrace.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Where project repositories come from and where they are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_remote_base")]
    pub remote_base: String,
    /// Directory under the output folder that holds the checkouts.
    #[serde(default = "default_repos_dir")]
    pub repos_dir: String,
}

fn default_remote_base() -> String {
    "https://github.com/".to_string()
}

fn default_repos_dir() -> String {
    "Repositories".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            remote_base: default_remote_base(),
            repos_dir: default_repos_dir(),
        }
    }
}

/// Tuning for the per-build extraction pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Worker threads for file parsing; 0 uses the available parallelism.
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/build/**".to_string(),
    ]
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Config {
    /// Load configuration from a `.skiptrace.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `skiptrace init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.skiptrace.toml` in the given directory, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: failed to load config from '{}': {e:#}. Using defaults.",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Generate default TOML content for `skiptrace init`.
    pub fn default_toml() -> String {
        r#"# Skiptrace configuration

[provider]
# Base URL that project names are appended to when cloning.
remote_base = "https://github.com/"
# Directory under the output folder that holds the checkouts.
repos_dir = "Repositories"

[extract]
# Worker threads for file parsing; 0 uses the available parallelism.
threads = 0
exclude_patterns = ["**/.git/**", "**/target/**", "**/build/**"]
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.remote_base, "https://github.com/");
        assert_eq!(config.provider.repos_dir, "Repositories");
        assert_eq!(config.extract.threads, 0);
        assert!(!config.extract.exclude_patterns.is_empty());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.provider.remote_base, "https://github.com/");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [provider]
            remote_base = "file:///srv/mirrors/"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.remote_base, "file:///srv/mirrors/");
        assert_eq!(config.provider.repos_dir, "Repositories");
        assert_eq!(config.extract.threads, 0);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(tmp.path());
        assert_eq!(config.provider.repos_dir, "Repositories");
    }
}
