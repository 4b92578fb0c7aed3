//! Configuration management for voxcall
//!
//! Settings resolve with precedence: environment variables >
//! `~/.config/voxcall/config.toml` > built-in defaults. The TOML file is a
//! partial overlay; every field is optional.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default chat endpoint (the conversation service's address)
const DEFAULT_CHAT_URL: &str = "http://localhost:65432/api/chat";

/// Default TTS endpoint
const DEFAULT_TTS_URL: &str = "http://localhost:65432/api/tts";

/// Default STT endpoint
const DEFAULT_STT_URL: &str = "http://localhost:65432/api/stt";

/// Default spoken prompt after a stretch of silence
const DEFAULT_IDLE_PROMPT: &str = "I'm still here if you need me.";

/// voxcall runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote endpoint addresses and HTTP behavior
    pub endpoints: EndpointsConfig,

    /// Utterance filter thresholds
    pub filter: FilterConfig,

    /// Idle prompt timing
    pub idle: IdleConfig,

    /// Recognizer restart bounds
    pub restart: RestartConfig,
}

/// Remote endpoint configuration
#[derive(Debug, Clone)]
pub struct EndpointsConfig {
    /// Chat endpoint URL
    pub chat_url: String,

    /// TTS endpoint URL
    pub tts_url: String,

    /// STT endpoint URL
    pub stt_url: String,

    /// Per-request timeout applied to every HTTP client
    pub request_timeout: Duration,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            chat_url: DEFAULT_CHAT_URL.to_string(),
            tts_url: DEFAULT_TTS_URL.to_string(),
            stt_url: DEFAULT_STT_URL.to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Utterance filter thresholds
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Minimum utterance length in characters (after trimming)
    pub min_chars: usize,

    /// Minimum recognition confidence; results without a score are trusted
    pub min_confidence: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_chars: 3,
            min_confidence: 0.6,
        }
    }
}

/// Idle prompt timing configuration
#[derive(Debug, Clone)]
pub struct IdleConfig {
    /// How often the idle predicate is evaluated
    pub check_interval: Duration,

    /// Silence duration that arms an idle prompt
    pub silence_threshold: Duration,

    /// Text spoken when the session has been silent too long
    pub prompt: String,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            silence_threshold: Duration::from_secs(15),
            prompt: DEFAULT_IDLE_PROMPT.to_string(),
        }
    }
}

/// Recognizer restart bounds
///
/// Consecutive recognizer terminations back off exponentially from
/// `base_delay` up to `max_delay`; after `max_attempts` without a recognized
/// utterance in between, the session stops listening.
#[derive(Debug, Clone)]
pub struct RestartConfig {
    /// First backoff step (the very first restart is immediate)
    pub base_delay: Duration,

    /// Backoff ceiling
    pub max_delay: Duration,

    /// Consecutive restarts tolerated before giving up
    pub max_attempts: u32,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 12,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConfig::default(),
            filter: FilterConfig::default(),
            idle: IdleConfig::default(),
            restart: RestartConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the optional TOML file
    #[must_use]
    pub fn load() -> Self {
        Self::from_overlay(load_config_file())
    }

    /// Resolve a configuration from a TOML overlay plus the environment
    fn from_overlay(fc: ConfigFile) -> Self {
        let defaults = Self::default();

        let endpoints = EndpointsConfig {
            chat_url: std::env::var("VOXCALL_CHAT_URL")
                .ok()
                .or(fc.endpoints.chat_url)
                .unwrap_or(defaults.endpoints.chat_url),
            tts_url: std::env::var("VOXCALL_TTS_URL")
                .ok()
                .or(fc.endpoints.tts_url)
                .unwrap_or(defaults.endpoints.tts_url),
            stt_url: std::env::var("VOXCALL_STT_URL")
                .ok()
                .or(fc.endpoints.stt_url)
                .unwrap_or(defaults.endpoints.stt_url),
            request_timeout: std::env::var("VOXCALL_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.endpoints.request_timeout_secs)
                .map_or(defaults.endpoints.request_timeout, Duration::from_secs),
        };

        let filter = FilterConfig {
            min_chars: fc.filter.min_chars.unwrap_or(defaults.filter.min_chars),
            min_confidence: fc
                .filter
                .min_confidence
                .unwrap_or(defaults.filter.min_confidence),
        };

        let idle = IdleConfig {
            check_interval: fc
                .idle
                .check_interval_secs
                .map_or(defaults.idle.check_interval, Duration::from_secs),
            silence_threshold: fc
                .idle
                .silence_threshold_secs
                .map_or(defaults.idle.silence_threshold, Duration::from_secs),
            prompt: std::env::var("VOXCALL_IDLE_PROMPT")
                .ok()
                .or(fc.idle.prompt)
                .unwrap_or(defaults.idle.prompt),
        };

        let restart = RestartConfig {
            base_delay: fc
                .restart
                .base_delay_ms
                .map_or(defaults.restart.base_delay, Duration::from_millis),
            max_delay: fc
                .restart
                .max_delay_ms
                .map_or(defaults.restart.max_delay, Duration::from_millis),
            max_attempts: fc
                .restart
                .max_attempts
                .unwrap_or(defaults.restart.max_attempts),
        };

        Self {
            endpoints,
            filter,
            idle,
            restart,
        }
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    endpoints: EndpointsFileConfig,

    #[serde(default)]
    filter: FilterFileConfig,

    #[serde(default)]
    idle: IdleFileConfig,

    #[serde(default)]
    restart: RestartFileConfig,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointsFileConfig {
    chat_url: Option<String>,
    tts_url: Option<String>,
    stt_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterFileConfig {
    min_chars: Option<usize>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct IdleFileConfig {
    check_interval_secs: Option<u64>,
    silence_threshold_secs: Option<u64>,
    prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RestartFileConfig {
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    max_attempts: Option<u32>,
}

/// Load the TOML config file from the standard path
///
/// Returns defaults if the file doesn't exist or can't be parsed.
fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voxcall/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voxcall").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_contract() {
        let config = Config::default();
        assert_eq!(config.filter.min_chars, 3);
        assert!((config.filter.min_confidence - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.idle.check_interval, Duration::from_secs(5));
        assert_eq!(config.idle.silence_threshold, Duration::from_secs(15));
        assert_eq!(config.idle.prompt, "I'm still here if you need me.");
        assert_eq!(config.endpoints.chat_url, "http://localhost:65432/api/chat");
    }

    #[test]
    fn overlay_applies_partial_file() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [endpoints]
            chat_url = "http://example.test/chat"

            [idle]
            silence_threshold_secs = 30
            "#,
        )
        .unwrap();

        let config = Config::from_overlay(fc);
        assert_eq!(config.endpoints.chat_url, "http://example.test/chat");
        assert_eq!(config.endpoints.tts_url, "http://localhost:65432/api/tts");
        assert_eq!(config.idle.silence_threshold, Duration::from_secs(30));
        assert_eq!(config.idle.check_interval, Duration::from_secs(5));
    }

    #[test]
    fn empty_overlay_keeps_defaults() {
        let config = Config::from_overlay(ConfigFile::default());
        assert_eq!(config.restart.max_attempts, 12);
        assert_eq!(config.restart.base_delay, Duration::from_millis(500));
        assert_eq!(config.endpoints.request_timeout, Duration::from_secs(15));
    }
}
