use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Bounds every single network operation is clamped into.
const MIN_OPERATION_SECS: u64 = 10;
const MAX_OPERATION_SECS: u64 = 60;
/// Ceiling for a whole extraction, every fallback step included.
const MAX_DEADLINE_SECS: u64 = 300;

#[derive(SmartDefault, Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(default)]
pub struct ExtractorConfig {
    /// yt-dlp executable
    #[default("yt-dlp")]
    pub resolver_path: String,
    pub proxy: Option<String>,
    /// browsers whose cookie jars may be borrowed, in order of preference
    #[default(_code = "vec![\"chrome\".to_string(), \"edge\".to_string()]")]
    pub identity_sources: Vec<String>,
    #[default(true)]
    pub mirrors_enabled: bool,
    #[default(90)]
    pub overall_deadline_secs: u64,
    #[default(150)]
    pub max_error_len: usize,
    pub timeouts: Timeouts,
    /// overrides the locales detected from the system
    pub locales: Option<Vec<String>>,
}

#[derive(SmartDefault, Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(default)]
pub struct Timeouts {
    #[default(45)]
    pub resolver_secs: u64,
    #[default(30)]
    pub probe_secs: u64,
    #[default(15)]
    pub page_secs: u64,
    #[default(15)]
    pub mirror_secs: u64,
    #[default(10)]
    pub redirect_secs: u64,
}

impl Timeouts {
    pub fn resolver(&self) -> Duration {
        clamped(self.resolver_secs)
    }

    pub fn probe(&self) -> Duration {
        clamped(self.probe_secs)
    }

    pub fn page(&self) -> Duration {
        clamped(self.page_secs)
    }

    pub fn mirror(&self) -> Duration {
        clamped(self.mirror_secs)
    }

    pub fn redirect(&self) -> Duration {
        clamped(self.redirect_secs)
    }
}

pub(crate) fn clamped(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_OPERATION_SECS, MAX_OPERATION_SECS))
}

impl ExtractorConfig {
    /// Defaults, overridden by the environment.
    pub fn from_env() -> Self {
        let mut config = ExtractorConfig::default();
        config.apply_env(|k| env::var(k).ok());
        config
    }

    /// TOML file, overridden by the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: ExtractorConfig =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        config.apply_env(|k| env::var(k).ok());
        Ok(config)
    }

    pub fn overall_deadline(&self) -> Duration {
        Duration::from_secs(
            self.overall_deadline_secs
                .clamp(MIN_OPERATION_SECS, MAX_DEADLINE_SECS),
        )
    }

    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("POSTGRAB_RESOLVER").filter(|v| !v.is_empty()) {
            self.resolver_path = path;
        }
        if let Some(proxy) = var("http_proxy").filter(|v| !v.is_empty()) {
            self.proxy = Some(proxy);
        }
        if let Some(sources) = var("POSTGRAB_IDENTITY_SOURCES") {
            self.identity_sources = sources
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(mirrors) = var("POSTGRAB_MIRRORS") {
            self.mirrors_enabled = !matches!(
                mirrors.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        if let Some(secs) = var("POSTGRAB_DEADLINE_SECS").and_then(|v| v.trim().parse().ok()) {
            self.overall_deadline_secs = secs;
        }
    }
}
