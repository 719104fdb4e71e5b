use super::*;
use serial_test::serial;
use std::env;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_brandcheck_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("BRANDCHECK_QDRANT_URL");
        env::remove_var("BRANDCHECK_EMBEDDING_ENDPOINT");
        env::remove_var("BRANDCHECK_EMBEDDING_MODEL");
        env::remove_var("BRANDCHECK_EMBEDDING_API_KEY");
        env::remove_var("BRANDCHECK_SEARCH_API_KEY");
        env::remove_var("BRANDCHECK_SEARCH_ENGINE_ID");
        env::remove_var("BRANDCHECK_KG_API_KEY");
        env::remove_var("BRANDCHECK_TEXT_MODEL");
        env::remove_var("BRANDCHECK_VISION_MODEL");
        env::remove_var("BRANDCHECK_TIER_TIMEOUT_SECS");
        env::remove_var("BRANDCHECK_FRONT_CACHE_CAPACITY");
    }
}

#[test]
#[serial]
fn default_config() {
    clear_brandcheck_env();
    let config = Config::default();

    assert_eq!(config.qdrant_url, DEFAULT_QDRANT_URL);
    assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
    assert!(config.embedding_api_key.is_none());
    assert!(config.search_api_key.is_none());
    assert!(config.kg_api_key.is_none());
    assert_eq!(config.tier_timeout_secs, 10);
    assert_eq!(config.front_cache_capacity, 10_000);
}

#[test]
#[serial]
fn from_env_uses_defaults_when_unset() {
    clear_brandcheck_env();
    let config = Config::from_env().expect("defaults should validate");
    assert_eq!(config.qdrant_url, DEFAULT_QDRANT_URL);
    assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
    assert_eq!(config.vision_model, DEFAULT_VISION_MODEL);
}

#[test]
#[serial]
fn from_env_reads_overrides() {
    clear_brandcheck_env();
    with_env_vars(
        &[
            ("BRANDCHECK_QDRANT_URL", "http://qdrant.internal:6334"),
            ("BRANDCHECK_KG_API_KEY", "kg-key"),
            ("BRANDCHECK_TIER_TIMEOUT_SECS", "30"),
        ],
        || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.qdrant_url, "http://qdrant.internal:6334");
            assert_eq!(config.kg_api_key.as_deref(), Some("kg-key"));
            assert_eq!(config.tier_timeout_secs, 30);
            assert_eq!(config.tier_timeout(), std::time::Duration::from_secs(30));
        },
    );
}

#[test]
#[serial]
fn blank_api_keys_are_treated_as_missing() {
    clear_brandcheck_env();
    with_env_vars(&[("BRANDCHECK_SEARCH_API_KEY", "   ")], || {
        let config = Config::from_env().unwrap();
        assert!(config.search_api_key.is_none());
    });
}

#[test]
#[serial]
fn invalid_number_is_an_error() {
    clear_brandcheck_env();
    with_env_vars(&[("BRANDCHECK_TIER_TIMEOUT_SECS", "soon")], || {
        let error = Config::from_env().unwrap_err();
        assert!(matches!(error, ConfigError::NumberParseError { .. }));
    });
}

#[test]
#[serial]
fn zero_timeout_is_rejected() {
    clear_brandcheck_env();
    with_env_vars(&[("BRANDCHECK_TIER_TIMEOUT_SECS", "0")], || {
        let error = Config::from_env().unwrap_err();
        assert!(matches!(error, ConfigError::ZeroTimeout { .. }));
    });
}

#[test]
#[serial]
fn zero_capacity_is_rejected() {
    clear_brandcheck_env();
    let config = Config {
        front_cache_capacity: 0,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ZeroCapacity { .. })
    ));
}
