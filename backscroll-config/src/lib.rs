//! Loader for Backscroll configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added; `BACKSCROLL__`-prefixed
//! environment variables (with `__` as the nesting separator) are layered on
//! top, so `BACKSCROLL__ENGINE__WORKERS=5` overrides `engine.workers`. String
//! values may reference `${VAR}` placeholders, expanded after merging.
use backscroll_common::EngineSettings;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "BACKSCROLL";

#[derive(Debug, Deserialize)]
pub struct BackscrollConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl BackscrollConfig {
    /// Look up an enabled source by id.
    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.enabled_sources().find(|s| s.id == id)
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.iter().filter(|s| s.enabled.unwrap_or(true))
    }
}

/// Shared fields + the per-kind provider details.
#[derive(Debug, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Default watchlist scraped when the caller names no entities.
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(flatten)]
    pub details: SourceDetails,
}

/// The tag is `kind`; the payload lives in `config`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum SourceDetails {
    #[serde(rename = "twitter154")]
    Twitter154 { config: Twitter154Config },

    #[serde(rename = "tiingo")]
    Tiingo { config: TiingoConfig },

    #[serde(rename = "reddit")]
    Reddit { config: RedditConfig },
}

#[derive(Debug, Deserialize)]
pub struct Twitter154Config {
    #[serde(default)]
    pub api_key: String,
    /// Env var re-read whenever the key is rotated; wins over `api_key`.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub include_replies: bool,
    #[serde(default = "default_twitter_page_size")]
    pub page_size: u32,
    #[serde(default = "default_twitter_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct TiingoConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub api_token_env: Option<String>,
    /// Topic tags sent alongside the ticker, e.g. `[earnings]`.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_tiingo_page_size")]
    pub page_size: u32,
    #[serde(default = "default_tiingo_endpoint")]
    pub endpoint: String,
}

/// Which subreddit listing to read. Only `new` is time-ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditListing {
    #[default]
    New,
    Hot,
    Top,
}

impl RedditListing {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedditListing::New => "new",
            RedditListing::Hot => "hot",
            RedditListing::Top => "top",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RedditConfig {
    /// OAuth bearer token.
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_env: Option<String>,
    #[serde(default)]
    pub listing: RedditListing,
    #[serde(default = "default_reddit_page_size")]
    pub page_size: u32,
    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_reddit_endpoint")]
    pub endpoint: String,
}

fn default_twitter_page_size() -> u32 {
    100
}
fn default_twitter_endpoint() -> String {
    "https://twitter154.p.rapidapi.com".into()
}
fn default_tiingo_page_size() -> u32 {
    100
}
fn default_tiingo_endpoint() -> String {
    "https://api.tiingo.com".into()
}
fn default_reddit_page_size() -> u32 {
    100
}
fn default_reddit_user_agent() -> String {
    concat!("backscroll/", env!("CARGO_PKG_VERSION")).into()
}
fn default_reddit_endpoint() -> String {
    "https://oauth.reddit.com".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct BackscrollConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for BackscrollConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BackscrollConfigLoader {
    /// Start empty; `BACKSCROLL__` env overrides are applied last in [`Self::load`].
    ///
    /// ```
    /// use backscroll_config::BackscrollConfigLoader;
    ///
    /// let config = BackscrollConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nsources: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.engine.workers, 3);
    /// assert!(config.sources.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so env-only deployments still load.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use backscroll_config::{BackscrollConfigLoader, SourceDetails};
    ///
    /// let cfg = BackscrollConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// sources:
    ///   - id: "tw"
    ///     kind: "twitter154"
    ///     entities: ["alice", "bob"]
    ///     config:
    ///       api_key: "example"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let tw = cfg.source("tw").expect("source present");
    /// assert_eq!(tw.entities, vec!["alice", "bob"]);
    /// assert!(matches!(tw.details, SourceDetails::Twitter154 { .. }));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into typed config.
    pub fn load(self) -> Result<BackscrollConfig, ConfigError> {
        // Env goes last so it overrides every file and snippet.
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: BackscrollConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.engine = typed.engine.sanitized();

        let mut seen = std::collections::HashSet::new();
        for spec in &typed.sources {
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::Message(format!(
                    "duplicate source id: {}",
                    spec.id
                )));
            }
        }

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("TICKER", Some("btc")), ("KEY", Some("k1"))], || {
            let mut v = json!([
                "watch-$TICKER",
                { "api_key": "${KEY}-${TICKER}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["watch-btc", { "api_key": "k1-btc" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST_BACKSCROLL}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST_BACKSCROLL}"));
    }

    #[test]
    fn duplicate_source_ids_are_rejected() {
        let err = BackscrollConfigLoader::new()
            .with_yaml_str(
                r#"
sources:
  - id: tw
    kind: twitter154
    config: { api_key: a }
  - id: tw
    kind: tiingo
    config: { api_token: b }
"#,
            )
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate source id"));
    }

    #[test]
    fn key_may_come_from_named_env_var() {
        let cfg = BackscrollConfigLoader::new()
            .with_yaml_str(
                r#"
sources:
  - id: tw
    kind: twitter154
    config: { api_key_env: RAPIDAPI_KEY, include_replies: true }
"#,
            )
            .load()
            .unwrap();
        let SourceDetails::Twitter154 { config } = &cfg.sources[0].details else {
            panic!("expected twitter154");
        };
        assert_eq!(config.api_key_env.as_deref(), Some("RAPIDAPI_KEY"));
        assert!(config.api_key.is_empty());
        assert!(config.include_replies);
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn reddit_listing_and_defaults() {
        let cfg = BackscrollConfigLoader::new()
            .with_yaml_str(
                r#"
sources:
  - id: rd
    kind: reddit
    entities: [bitcoin]
    config: { access_token_env: REDDIT_TOKEN, listing: top }
  - id: rd-new
    kind: reddit
    config: { access_token: t }
"#,
            )
            .load()
            .unwrap();
        let SourceDetails::Reddit { config } = &cfg.sources[0].details else {
            panic!("expected reddit");
        };
        assert_eq!(config.listing, RedditListing::Top);
        assert_eq!(config.access_token_env.as_deref(), Some("REDDIT_TOKEN"));
        assert_eq!(config.endpoint, "https://oauth.reddit.com");
        assert!(config.user_agent.starts_with("backscroll/"));

        let SourceDetails::Reddit { config } = &cfg.sources[1].details else {
            panic!("expected reddit");
        };
        assert_eq!(config.listing, RedditListing::New);
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn unknown_reddit_listing_is_rejected() {
        let err = BackscrollConfigLoader::new()
            .with_yaml_str(
                r#"
sources:
  - id: rd
    kind: reddit
    config: { access_token: t, listing: rising }
"#,
            )
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("rising"), "{err}");
    }

    #[test]
    fn disabled_sources_are_hidden() {
        let cfg = BackscrollConfigLoader::new()
            .with_yaml_str(
                r#"
sources:
  - id: off
    kind: tiingo
    enabled: false
    config: { api_token: b }
"#,
            )
            .load()
            .unwrap();
        assert!(cfg.source("off").is_none());
        assert_eq!(cfg.sources.len(), 1);
    }
}
