//! Tiingo news, newest first, paged by offset.
//!
//! Entities are tickers. The cursor is the offset of the next page; a page
//! shorter than the requested limit is the last one.
use async_trait::async_trait;
use backscroll_config::TiingoConfig;
use backscroll_engine::{Cursor, DataSource, EntityId, Item, Page, SourceError};
use backscroll_http::{Auth, HttpClient, HttpError, RequestOpts};
use std::borrow::Cow;
use std::sync::Arc;

use crate::credentials::{CredentialProvider, Secret};
use crate::upstream;

pub mod types;

pub use types::NewsArticle;

pub const DEFAULT_ENDPOINT: &str = "https://api.tiingo.com";
const NEWS_PATH: &str = "tiingo/news";

#[derive(Clone)]
pub struct TiingoNewsSource {
    http: HttpClient,
    credentials: Arc<dyn CredentialProvider>,
    page_size: u32,
    tags: Vec<String>,
}

impl TiingoNewsSource {
    pub fn new(http: HttpClient, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http,
            credentials,
            page_size: 100,
            tags: Vec::new(),
        }
    }

    /// Restrict results to articles carrying any of these topic tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn from_config(
        config: &TiingoConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config.endpoint)?;
        Ok(Self::new(http, credentials)
            .with_page_size(config.page_size)
            .with_tags(config.tags.clone()))
    }

    async fn news(
        &self,
        ticker: &str,
        offset: u64,
        token: &Secret,
    ) -> Result<Vec<NewsArticle>, HttpError> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("tickers", ticker.into()),
            ("limit", self.page_size.to_string().into()),
            ("offset", offset.to_string().into()),
            ("sortBy", "publishedDate".into()),
        ];
        if !self.tags.is_empty() {
            params.push(("tags", self.tags.join(",").into()));
        }
        self.http
            .get_json(
                NEWS_PATH,
                RequestOpts {
                    auth: Some(Auth::Query {
                        name: "token",
                        value: Cow::Borrowed(token.expose()),
                    }),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
    }

    fn page_from(&self, offset: u64, articles: Vec<NewsArticle>) -> Result<Page, SourceError> {
        let fetched = articles.len() as u64;
        let items = articles
            .into_iter()
            .map(NewsArticle::into_item)
            .collect::<Result<Vec<Item>, String>>()
            .map_err(SourceError::Malformed)?;

        let next = (fetched >= u64::from(self.page_size))
            .then(|| Cursor::new((offset + fetched).to_string()));
        Ok(Page::new(items, next))
    }
}

fn parse_offset(cursor: Option<&Cursor>) -> Result<u64, SourceError> {
    match cursor {
        None => Ok(0),
        Some(c) => c
            .as_str()
            .parse()
            .map_err(|_| SourceError::Malformed(format!("offset cursor {c:?} is not a number"))),
    }
}

#[async_trait]
impl DataSource for TiingoNewsSource {
    fn name(&self) -> &str {
        "tiingo"
    }

    async fn fetch(&self, entity: &EntityId, cursor: Option<&Cursor>) -> Result<Page, SourceError> {
        let offset = parse_offset(cursor)?;
        let token = self
            .credentials
            .get()
            .await
            .map_err(upstream::credential_error)?;

        match self.news(entity.as_str(), offset, &token).await {
            Ok(articles) => self.page_from(offset, articles),
            Err(err) => Err(upstream::throttled(self.name(), self.credentials.as_ref(), err).await),
        }
    }
}
