use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;
use url::Url;

use crate::{media::DEFAULT_MEDIA_BASE_URL, view::DEFAULT_REDIRECT_DELAY};

pub const SETTINGS_FILE: &str = "knoology.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub media_base_url: String,
    pub session_db_url: String,
    pub redirect_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            media_base_url: DEFAULT_MEDIA_BASE_URL.into(),
            session_db_url: "sqlite://./data/session.db".into(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = "value"` file at `path` if present, then
/// environment overrides read through `env`.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_base_url") {
                    set_base_url(&mut settings.api_base_url, v, "api_base_url");
                }
                if let Some(v) = file_cfg.get("media_base_url") {
                    set_base_url(&mut settings.media_base_url, v, "media_base_url");
                }
                if let Some(v) = file_cfg.get("session_db_url") {
                    settings.session_db_url = normalize_session_db_url(v);
                }
                if let Some(v) = file_cfg.get("redirect_delay_ms") {
                    set_delay(&mut settings.redirect_delay, v);
                }
            }
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable settings file"),
        }
    }

    for key in ["KNOOLOGY_API_URL", "APP__API_BASE_URL"] {
        if let Some(v) = env(key) {
            set_base_url(&mut settings.api_base_url, &v, key);
        }
    }
    for key in ["KNOOLOGY_MEDIA_URL", "APP__MEDIA_BASE_URL"] {
        if let Some(v) = env(key) {
            set_base_url(&mut settings.media_base_url, &v, key);
        }
    }
    if let Some(v) = env("APP__SESSION_DB_URL") {
        settings.session_db_url = normalize_session_db_url(&v);
    }
    if let Some(v) = env("APP__REDIRECT_DELAY_MS") {
        set_delay(&mut settings.redirect_delay, &v);
    }

    settings
}

fn set_base_url(slot: &mut String, raw: &str, source: &str) {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => *slot = raw.to_string(),
        Ok(url) => warn!(source, scheme = url.scheme(), "base url must be http(s); keeping default"),
        Err(err) => warn!(source, error = %err, "invalid base url; keeping default"),
    }
}

fn set_delay(slot: &mut Duration, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(ms) => *slot = Duration::from_millis(ms),
        Err(err) => warn!(value = raw, error = %err, "invalid redirect delay; keeping default"),
    }
}

pub fn normalize_session_db_url(raw: &str) -> String {
    let raw = raw.trim();

    if raw.is_empty() {
        return Settings::default().session_db_url;
    }

    if raw.starts_with("sqlite::memory:") || raw.starts_with("sqlite://") || raw.contains("://") {
        return raw.to_string();
    }

    if let Some(path) = raw.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
