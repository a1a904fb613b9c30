use async_trait::async_trait;
use backscroll_config::Twitter154Config;
use backscroll_engine::{Cursor, DataSource, EntityId, Item, Page, SourceError};
use backscroll_http::HttpError;
use std::sync::Arc;

use crate::credentials::CredentialProvider;
use crate::twitter::client::Twitter154Api;
use crate::twitter::types::TimelineResponse;
use crate::upstream;

/// User timeline as a [`DataSource`]; entities are usernames.
#[derive(Clone)]
pub struct Twitter154Source {
    api: Twitter154Api,
    credentials: Arc<dyn CredentialProvider>,
}

impl Twitter154Source {
    pub fn new(api: Twitter154Api, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { api, credentials }
    }

    pub fn from_config(
        config: &Twitter154Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, HttpError> {
        let api = Twitter154Api::new(&config.endpoint)?
            .with_include_replies(config.include_replies)
            .with_page_size(config.page_size);
        Ok(Self::new(api, credentials))
    }
}

/// Missing `results` means the provider answered with an error payload.
/// An empty page ends the feed even if a token came back with it.
fn into_page(entity: &EntityId, resp: TimelineResponse) -> Result<Page, SourceError> {
    let Some(tweets) = resp.results else {
        let reason = resp.message.unwrap_or_else(|| "Unknown error".into());
        return Err(SourceError::Malformed(format!("missing results: {reason}")));
    };
    if tweets.is_empty() {
        return Ok(Page::last(Vec::new()));
    }

    let items = tweets
        .into_iter()
        .map(|t| t.into_item(entity.as_str()))
        .collect::<Result<Vec<Item>, String>>()
        .map_err(SourceError::Malformed)?;

    Ok(Page::new(items, resp.continuation_token.map(Cursor::new)))
}

#[async_trait]
impl DataSource for Twitter154Source {
    fn name(&self) -> &str {
        "twitter154"
    }

    async fn fetch(&self, entity: &EntityId, cursor: Option<&Cursor>) -> Result<Page, SourceError> {
        let key = self
            .credentials
            .get()
            .await
            .map_err(upstream::credential_error)?;

        match self
            .api
            .timeline(entity.as_str(), cursor.map(Cursor::as_str), &key)
            .await
        {
            Ok(resp) => into_page(entity, resp),
            Err(err) => Err(upstream::throttled(self.name(), self.credentials.as_ref(), err).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resp(v: serde_json::Value) -> TimelineResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn error_payload_is_malformed() {
        let err = into_page(
            &"acct".into(),
            resp(json!({ "message": "User not found" })),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SourceError::Malformed("missing results: User not found".into())
        );
    }

    #[test]
    fn empty_results_end_the_feed() {
        let page = into_page(
            &"acct".into(),
            resp(json!({ "results": [], "continuation_token": "loop" })),
        )
        .unwrap();
        assert!(page.is_last());
    }

    #[test]
    fn bad_date_is_malformed() {
        let err = into_page(
            &"acct".into(),
            resp(json!({ "results": [{ "tweet_id": "1", "creation_date": "yesterday" }] })),
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
