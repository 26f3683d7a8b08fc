use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration, read from the environment.
///
/// API keys are looked up lazily per backend so a missing credential only
/// fails the backend that needs it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub session_dir: Option<PathBuf>,
    /// Timeout for the analysis step.
    pub analyze_timeout_secs: u64,
    /// Timeout for the generation and review steps, which carry a full
    /// artifact and take materially longer.
    pub generate_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            deepseek_api_key: None,
            session_dir: None,
            analyze_timeout_secs: 60,
            generate_timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.anthropic_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            config.deepseek_api_key = Some(key);
        }

        if let Ok(dir) = std::env::var("DECK_SESSION_DIR") {
            config.session_dir = Some(PathBuf::from(dir));
        }

        if let Some(secs) = env_u64("DECK_ANALYZE_TIMEOUT_SECS") {
            config.analyze_timeout_secs = secs;
        }

        if let Some(secs) = env_u64("DECK_GENERATE_TIMEOUT_SECS") {
            config.generate_timeout_secs = secs;
        }

        config
    }

    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.analyze_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    /// Where session-scoped state lives. Defaults to `~/.deck/session`.
    pub fn session_dir(&self) -> PathBuf {
        if let Some(dir) = &self.session_dir {
            return dir.clone();
        }
        let mut path = home_dir();
        path.push(".deck");
        path.push("session");
        path
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn home_dir() -> PathBuf {
    if let Ok(h) = std::env::var("HOME") {
        return PathBuf::from(h);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
