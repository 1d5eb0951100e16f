use royale_common::StealthLevel;
use royale_config::RoyaleConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_values_and_env_placeholders() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "royale.yaml",
        r#"
server:
  bind: "127.0.0.1:4000"
upstream:
  api_token: "${CR_API_TOKEN}"
  timeout_secs: 5
scraper:
  headless: false
  stealth: maximum
  deck_selectors: [".deck"]
"#,
    );

    temp_env::with_var("CR_API_TOKEN", Some("tok-from-env"), || {
        let config = RoyaleConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load config");

        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert_eq!(config.upstream.api_token, "tok-from-env");
        assert_eq!(config.upstream.timeout_secs, 5);
        assert_eq!(config.upstream.retries, 2);
        assert!(!config.scraper.headless);
        assert_eq!(config.scraper.stealth, StealthLevel::Maximum);
        assert_eq!(config.scraper.deck_selectors, vec![".deck".to_string()]);
        assert_eq!(config.scraper.poll_interval_ms, 500);
    });
}

#[test]
#[serial]
fn env_overrides_win_over_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "royale.yaml", "server:\n  bind: \"127.0.0.1:4000\"\n");

    temp_env::with_vars(
        [
            ("ROYALE__SERVER__BIND", Some("0.0.0.0:9999")),
            ("ROYALE__UPSTREAM__RETRIES", Some("5")),
        ],
        || {
            let config = RoyaleConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");
            assert_eq!(config.server.bind, "0.0.0.0:9999");
            assert_eq!(config.upstream.retries, 5);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    temp_env::with_var("CR_API_TOKEN", Some("fallback"), || {
        let config = RoyaleConfigLoader::new()
            .with_optional_file(tmp.path().join("absent.yaml"))
            .load()
            .expect("defaults load");
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.upstream.api_token, "fallback");
        assert_eq!(config.scraper.target_url, "https://royaleapi.com/decks/popular");
    });
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = RoyaleConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
