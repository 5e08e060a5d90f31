use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::Deserialize;

use crate::caption::DEFAULT_TOP_N;

/// What happens when `classify` is called again before an earlier call finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyPolicy {
    /// Every call runs to the end; the last one to finish owns the caption.
    #[default]
    LastWriterWins,
    /// A newer call supersedes older ones. Their inference still runs, but the
    /// result is dropped and never reaches the caption.
    SupersedePrevious,
}

impl FromStr for ConcurrencyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-writer-wins" => Ok(Self::LastWriterWins),
            "supersede-previous" => Ok(Self::SupersedePrevious),
            other => Err(anyhow::format_err!("unknown concurrency policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub top_n: NonZeroUsize,
    pub policy: ConcurrencyPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            policy: ConcurrencyPolicy::default(),
        }
    }
}

/// Where the CLIP weights come from and how labels become prompts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub repo: String,
    pub revision: String,
    /// `{}` is replaced by the label.
    pub prompt_template: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://hf-mirror.com".to_string(),
            repo: "openai/clip-vit-base-patch32".to_string(),
            revision: "refs/pr/15".to_string(),
            prompt_template: "a photo of a {}".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn prompt(&self, label: &str) -> String {
        self.prompt_template.replace("{}", label)
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub top_n: NonZeroUsize,
    pub policy: ConcurrencyPolicy,
    pub labels: Vec<String>,
    pub model: ModelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            policy: ConcurrencyPolicy::default(),
            labels: ["daisy", "dandelion", "rose", "sunflower", "tulip"]
                .into_iter()
                .map(String::from)
                .collect(),
            model: ModelConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            top_n: self.top_n,
            policy: self.policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            policy = "supersede-previous"
            labels = ["cat", "dog"]

            [model]
            prompt_template = "a picture of {}"
            "#,
        )
        .unwrap();
        assert_eq!(config.top_n.get(), 2);
        assert_eq!(config.policy, ConcurrencyPolicy::SupersedePrevious);
        assert_eq!(config.labels, vec!["cat", "dog"]);
        assert_eq!(config.model.repo, "openai/clip-vit-base-patch32");
        assert_eq!(config.model.prompt("cat"), "a picture of cat");
        assert_eq!(config.pipeline().policy, ConcurrencyPolicy::SupersedePrevious);
    }

    #[test]
    fn zero_top_n_is_rejected() {
        assert!(toml::from_str::<AppConfig>("top_n = 0").is_err());
        let config: AppConfig = toml::from_str("top_n = 3").unwrap();
        assert_eq!(config.pipeline().top_n.get(), 3);
    }

    #[test]
    fn empty_file_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn policy_from_flag() {
        assert_eq!(
            "last-writer-wins".parse::<ConcurrencyPolicy>().unwrap(),
            ConcurrencyPolicy::LastWriterWins
        );
        assert!("newest".parse::<ConcurrencyPolicy>().is_err());
    }
}
