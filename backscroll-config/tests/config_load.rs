use backscroll_config::{BackscrollConfigLoader, SourceDetails};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
version: "1"
engine:
  workers: 2
  page_delay_ms: 250
sources:
  - id: twitter
    kind: twitter154
    entities: [whale_alert, db_news]
    config:
      api_key: "${BACKSCROLL_TEST_RAPIDAPI_KEY}"
      include_replies: true
  - id: news
    kind: tiingo
    entities: [btcusd]
    config:
      api_token: "${BACKSCROLL_TEST_TIINGO_TOKEN}"
      page_size: 50
"#;

#[test]
#[serial]
fn loads_file_and_expands_secrets() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "backscroll.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("BACKSCROLL_TEST_RAPIDAPI_KEY", Some("rapid-123")),
            ("BACKSCROLL_TEST_TIINGO_TOKEN", Some("tiingo-456")),
        ],
        || BackscrollConfigLoader::new().with_file(&p).load(),
    )
    .expect("load config");

    assert_eq!(config.engine.workers, 2);
    assert_eq!(config.engine.page_delay_ms, 250);
    assert_eq!(config.engine.max_pages, 10_000);

    let tw = config.source("twitter").expect("twitter source");
    assert_eq!(tw.entities, vec!["whale_alert", "db_news"]);
    match &tw.details {
        SourceDetails::Twitter154 { config } => {
            assert_eq!(config.api_key, "rapid-123");
            assert!(config.include_replies);
            assert_eq!(config.page_size, 100);
            assert_eq!(config.endpoint, "https://twitter154.p.rapidapi.com");
        }
        other => panic!("expected twitter154, got {other:?}"),
    }

    match &config.source("news").expect("news source").details {
        SourceDetails::Tiingo { config } => {
            assert_eq!(config.api_token, "tiingo-456");
            assert_eq!(config.page_size, 50);
        }
        other => panic!("expected tiingo, got {other:?}"),
    }
}

#[test]
#[serial]
fn env_overrides_engine_settings() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "backscroll.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("BACKSCROLL__ENGINE__WORKERS", Some("7")),
            ("BACKSCROLL_TEST_RAPIDAPI_KEY", Some("x")),
            ("BACKSCROLL_TEST_TIINGO_TOKEN", Some("y")),
        ],
        || BackscrollConfigLoader::new().with_file(&p).load(),
    )
    .expect("load config");

    assert_eq!(config.engine.workers, 7);
    assert_eq!(config.engine.page_delay_ms, 250);
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = BackscrollConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults load");

    assert!(config.sources.is_empty());
    assert_eq!(config.engine.workers, 3);
    assert_eq!(config.engine.lookback_days, 7);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = BackscrollConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
