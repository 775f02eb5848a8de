use crate::clock::DailyTime;
use crate::mood::Mood;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaybookConfig {
    pub llm: LlmConfig,
    pub scheduler: SchedulerConfig,
    pub fallbacks: FallbackConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl DaybookConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: DaybookConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DAYBOOK_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("DAYBOOK_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("DAYBOOK_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("DAYBOOK_SCHEDULE_TIME") {
            self.scheduler.schedule_time = v;
        }
        if let Ok(v) = std::env::var("DAYBOOK_DB_PATH") {
            self.storage.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DAYBOOK_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Reject values that parse as TOML but cannot drive the system.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.daily_time()?;
        if self.fallbacks.default_title.trim().is_empty() {
            anyhow::bail!("fallbacks.default_title must not be empty");
        }
        if self.fallbacks.none_sentinel.trim().is_empty() {
            anyhow::bail!("fallbacks.none_sentinel must not be empty");
        }
        Ok(())
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai`, `gemini` or `mock`.
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    /// Per-request timeout. A timed-out call counts as a transient failure.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Local wall-clock time, `HH:MM`.
    pub schedule_time: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule_time: "23:59".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn daily_time(&self) -> Result<DailyTime> {
        self.schedule_time
            .parse()
            .with_context(|| format!("Invalid scheduler.schedule_time `{}`", self.schedule_time))
    }
}

/// Values substituted when generated text is missing or unusable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub default_mood: Mood,
    pub default_title: String,
    /// Extraction output containing this keyword (any case) means "no fact".
    pub none_sentinel: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            default_mood: Mood::Neutral,
            default_title: "My Diary Entry".to_string(),
            none_sentinel: "NONE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("daybook.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
    /// When set, logs also go to daily rolling files in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
