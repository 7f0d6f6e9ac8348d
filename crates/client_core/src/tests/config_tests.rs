use super::*;
use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/knoology.toml"), env_of(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.media_base_url, "http://127.0.0.1:8000/media/");
    assert_eq!(settings.redirect_delay, Duration::from_secs(2));
}

#[test]
fn file_values_apply_then_env_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("knoology.toml");
    fs::write(
        &path,
        "api_base_url = \"https://lms.example.org/api\"\nredirect_delay_ms = \"500\"\nsession_db_url = \"data/s.db\"\n",
    )
    .expect("write settings");

    let settings = load_settings_from(
        &path,
        env_of(&[("APP__API_BASE_URL", "http://10.0.0.2:8000/api")]),
    );
    assert_eq!(settings.api_base_url, "http://10.0.0.2:8000/api");
    assert_eq!(settings.redirect_delay, Duration::from_millis(500));
    assert_eq!(settings.session_db_url, "sqlite://data/s.db");
}

#[test]
fn app_prefixed_env_overrides_short_name() {
    let settings = load_settings_from(
        Path::new("/nonexistent"),
        env_of(&[
            ("KNOOLOGY_MEDIA_URL", "http://a.example/media/"),
            ("APP__MEDIA_BASE_URL", "http://b.example/media/"),
        ]),
    );
    assert_eq!(settings.media_base_url, "http://b.example/media/");
}

#[test]
fn invalid_urls_and_delays_keep_defaults() {
    let settings = load_settings_from(
        Path::new("/nonexistent"),
        env_of(&[
            ("KNOOLOGY_API_URL", "not a url"),
            ("KNOOLOGY_MEDIA_URL", "ftp://files.example/media/"),
            ("APP__REDIRECT_DELAY_MS", "soon"),
        ]),
    );
    let defaults = Settings::default();
    assert_eq!(settings.api_base_url, defaults.api_base_url);
    assert_eq!(settings.media_base_url, defaults.media_base_url);
    assert_eq!(settings.redirect_delay, defaults.redirect_delay);
}

#[test]
fn session_db_urls_are_normalized() {
    assert_eq!(normalize_session_db_url(""), "sqlite://./data/session.db");
    assert_eq!(normalize_session_db_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_session_db_url("sqlite:data\\s.db"), "sqlite://data/s.db");
    assert_eq!(normalize_session_db_url("./s.db"), "sqlite://./s.db");
}
