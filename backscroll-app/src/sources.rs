//! Turn a configured source into a ready [`DataSource`].
use anyhow::{Context, Result, bail};
use backscroll_config::{BackscrollConfig, SourceDetails, SourceSpec};
use backscroll_engine::{DataSource, EntityId};
use backscroll_social::{
    CredentialProvider, EnvCredentials, RedditSource, StaticCredentials, TiingoNewsSource,
    Twitter154Source,
};
use std::sync::Arc;

/// Named env var wins, so keys can be rotated without a restart.
fn credentials(
    source_id: &str,
    literal: &str,
    env_var: Option<&str>,
) -> Result<Arc<dyn CredentialProvider>> {
    if let Some(var) = env_var {
        return Ok(Arc::new(EnvCredentials::new(var)));
    }
    let creds = StaticCredentials::new(literal)
        .with_context(|| format!("source {source_id}: no api key configured"))?;
    Ok(Arc::new(creds))
}

pub fn build_source(spec: &SourceSpec) -> Result<Arc<dyn DataSource>> {
    let source: Arc<dyn DataSource> = match &spec.details {
        SourceDetails::Twitter154 { config } => {
            let creds = credentials(&spec.id, &config.api_key, config.api_key_env.as_deref())?;
            Arc::new(
                Twitter154Source::from_config(config, creds)
                    .with_context(|| format!("source {}: bad endpoint", spec.id))?,
            )
        }
        SourceDetails::Tiingo { config } => {
            let creds = credentials(&spec.id, &config.api_token, config.api_token_env.as_deref())?;
            Arc::new(
                TiingoNewsSource::from_config(config, creds)
                    .with_context(|| format!("source {}: bad endpoint", spec.id))?,
            )
        }
        SourceDetails::Reddit { config } => {
            let creds = credentials(
                &spec.id,
                &config.access_token,
                config.access_token_env.as_deref(),
            )?;
            Arc::new(
                RedditSource::from_config(config, creds)
                    .with_context(|| format!("source {}: bad endpoint or user agent", spec.id))?,
            )
        }
    };
    tracing::debug!(id=%spec.id, kind=%source.name(), "sources.built");
    Ok(source)
}

pub fn find<'a>(cfg: &'a BackscrollConfig, id: &str) -> Result<&'a SourceSpec> {
    match cfg.source(id) {
        Some(spec) => Ok(spec),
        None => {
            let known: Vec<&str> = cfg.enabled_sources().map(|s| s.id.as_str()).collect();
            bail!("unknown or disabled source {id:?} (configured: {known:?})")
        }
    }
}

/// Explicit entities win over the source's configured watchlist.
pub fn entities_for(spec: &SourceSpec, requested: Vec<String>) -> Result<Vec<EntityId>> {
    let names = if requested.is_empty() {
        spec.entities.clone()
    } else {
        requested
    };
    if names.is_empty() {
        bail!(
            "source {:?} has no configured entities; pass --entity",
            spec.id
        );
    }
    Ok(names.into_iter().map(EntityId::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backscroll_config::BackscrollConfigLoader;

    fn config() -> BackscrollConfig {
        BackscrollConfigLoader::new()
            .with_yaml_str(
                r#"
sources:
  - id: tw
    kind: twitter154
    entities: [alice, bob]
    config: { api_key: k }
  - id: news
    kind: tiingo
    config: { api_token_env: BACKSCROLL_TEST_TIINGO }
  - id: off
    kind: tiingo
    enabled: false
    config: { api_token: t }
  - id: rd
    kind: reddit
    entities: [bitcoin]
    config: { access_token: t, listing: hot }
  - id: keyless
    kind: twitter154
    config: { include_replies: true }
"#,
            )
            .load()
            .unwrap()
    }

    #[test]
    fn builds_each_kind() {
        let cfg = config();
        assert_eq!(build_source(find(&cfg, "tw").unwrap()).unwrap().name(), "twitter154");
        assert_eq!(build_source(find(&cfg, "news").unwrap()).unwrap().name(), "tiingo");
        assert_eq!(build_source(find(&cfg, "rd").unwrap()).unwrap().name(), "reddit");
    }

    #[test]
    fn missing_key_is_an_error() {
        let cfg = config();
        let err = build_source(find(&cfg, "keyless").unwrap()).err().unwrap();
        assert!(err.to_string().contains("no api key"), "{err:#}");
    }

    #[test]
    fn disabled_sources_are_not_found() {
        let err = find(&config(), "off").unwrap_err();
        assert!(err.to_string().contains("unknown or disabled"));
    }

    #[test]
    fn entities_default_to_watchlist() {
        let cfg = config();
        let tw = find(&cfg, "tw").unwrap();
        assert_eq!(
            entities_for(tw, vec![]).unwrap(),
            vec![EntityId::from("alice"), EntityId::from("bob")]
        );
        assert_eq!(
            entities_for(tw, vec!["carol".into()]).unwrap(),
            vec![EntityId::from("carol")]
        );
        assert!(entities_for(find(&cfg, "news").unwrap(), vec![]).is_err());
    }
}
