//! CLI configuration.
//!
//! Read from `--config <file>` or `.xpf/config.yaml` in the working
//! directory. Credentials never live here; API keys come from the
//! environment only.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xpf_chat::LlmProvider;
use xpf_publish::DEFAULT_PREFIX;

/// Location of the project-level config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".xpf/config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpfConfig {
    /// Root directory manifests are written under.
    pub output_dir: Option<PathBuf>,
    /// Directory inside the root; `crossplane` when unset.
    pub path_prefix: Option<String>,
    pub llm: LlmConfig,
    pub git: GitConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub repo_path: Option<PathBuf>,
    pub base_branch: Option<String>,
}

impl XpfConfig {
    /// Load configuration, then apply `XPF_*` environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Self::load_from(explicit, &cwd)?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// An explicit path must exist; the default path is optional.
    pub fn load_from(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let default = cwd.join(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("XPF_OUTPUT_DIR").filter(|v| !v.is_empty()) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(model) = lookup("XPF_LLM_MODEL").filter(|v| !v.is_empty()) {
            self.llm.model = Some(model);
        }
        self
    }

    /// Output root: the command-line value, then config, then `.`.
    pub fn output_root(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn prefix(&self) -> &str {
        self.path_prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    pub fn llm_provider(&self) -> Result<Option<LlmProvider>> {
        match self.llm.provider.as_deref() {
            None => Ok(None),
            Some(name) => LlmProvider::from_str(name)
                .map(Some)
                .ok_or_else(|| {
                    anyhow::anyhow!("Invalid argument: unknown LLM provider '{}'", name)
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_default_config_is_empty() {
        let temp = TempDir::new().unwrap();
        let config = XpfConfig::load_from(None, temp.path()).unwrap();
        assert_eq!(config, XpfConfig::default());
        assert_eq!(config.prefix(), "crossplane");
        assert_eq!(config.output_root(None), PathBuf::from("."));
    }

    #[test]
    fn test_load_project_config() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".xpf")).unwrap();
        std::fs::write(
            temp.path().join(DEFAULT_CONFIG_PATH),
            "output_dir: /srv/gitops\n\
             path_prefix: infra\n\
             llm:\n  provider: anthropic\n\
             git:\n  base_branch: main\n",
        )
        .unwrap();

        let config = XpfConfig::load_from(None, temp.path()).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("/srv/gitops")));
        assert_eq!(config.prefix(), "infra");
        assert_eq!(config.llm_provider().unwrap(), Some(LlmProvider::Anthropic));
        assert_eq!(config.git.base_branch.as_deref(), Some("main"));
        assert_eq!(
            config.output_root(Some(PathBuf::from("out"))),
            PathBuf::from("out")
        );
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");
        assert!(XpfConfig::load_from(Some(&missing), temp.path()).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let config = XpfConfig::default().with_overrides(|key| match key {
            "XPF_OUTPUT_DIR" => Some("/tmp/manifests".to_string()),
            "XPF_LLM_MODEL" => Some("gpt-4o".to_string()),
            _ => None,
        });
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/manifests")));
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_unknown_provider() {
        let config = XpfConfig {
            llm: LlmConfig {
                provider: Some("cohere".to_string()),
                model: None,
            },
            ..Default::default()
        };
        assert!(config.llm_provider().is_err());
    }
}
