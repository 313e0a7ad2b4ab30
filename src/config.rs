//! Runtime configuration, read from the environment (and a `.env` file if present).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LANGUAGE: &str = "German";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the JSON files and logs.
    pub data_dir: PathBuf,
    pub advisor: AdvisorConfig,
}

#[derive(Clone)]
pub struct AdvisorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
    /// Language the coach is asked to answer in.
    pub language: String,
}

// Hand-written so the key never ends up in logs.
impl std::fmt::Debug for AdvisorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("language", &self.language)
            .finish()
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        AdvisorConfig {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            api_base: DEFAULT_API_BASE.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            language: DEFAULT_LANGUAGE.into(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` if there is one, then reads the environment.
    ///
    /// Variables:
    /// - `TASKCOACH_DATA_DIR`: data directory (default: the platform data dir + `taskcoach`)
    /// - `GEMINI_API_KEY` / `API_KEY`: key for the generative-text service
    /// - `TASKCOACH_MODEL`, `TASKCOACH_API_BASE`, `TASKCOACH_TIMEOUT_SECS`, `TASKCOACH_LANGUAGE`
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get("TASKCOACH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let defaults = AdvisorConfig::default();
        let timeout = get("TASKCOACH_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        AppConfig {
            data_dir,
            advisor: AdvisorConfig {
                api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
                model: get("TASKCOACH_MODEL").unwrap_or(defaults.model),
                api_base: get("TASKCOACH_API_BASE").unwrap_or(defaults.api_base),
                timeout,
                language: get("TASKCOACH_LANGUAGE").unwrap_or(defaults.language),
            },
        }
    }
}

/// `~/.local/share/taskcoach` on Linux, or `./.taskcoach` when there is no data dir.
fn default_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(mut p) => {
            p.push("taskcoach");
            p
        }
        None => PathBuf::from(".taskcoach"),
    }
}
