//! Subreddit listings over Reddit's OAuth API.
//!
//! Entities are subreddit names. `new` is newest-first and pages with the
//! listing's `after` fullname. `hot` and `top` are ranked, not time-ordered,
//! so they are read as a single snapshot page re-sorted newest-first.
use async_trait::async_trait;
use backscroll_config::{RedditConfig, RedditListing};
use backscroll_engine::{Cursor, DataSource, EntityId, Item, Page, SourceError};
use backscroll_http::{Auth, HeaderMap, HeaderName, HeaderValue, HttpClient, HttpError, RequestOpts};
use std::borrow::Cow;
use std::cmp::Reverse;
use std::sync::Arc;

use crate::credentials::{CredentialProvider, Secret};
use crate::upstream;

pub mod types;

pub use types::{Listing, Post};

pub const DEFAULT_ENDPOINT: &str = "https://oauth.reddit.com";
const POST_KIND: &str = "t3";

#[derive(Clone)]
pub struct RedditSource {
    http: HttpClient,
    credentials: Arc<dyn CredentialProvider>,
    listing: RedditListing,
    page_size: u32,
    user_agent: HeaderValue,
}

impl RedditSource {
    pub fn new(http: HttpClient, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http,
            credentials,
            listing: RedditListing::New,
            page_size: 100,
            user_agent: HeaderValue::from_static("backscroll"),
        }
    }

    pub fn with_listing(mut self, listing: RedditListing) -> Self {
        self.listing = listing;
        self
    }

    /// Reddit caps listings at 100 per request.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.clamp(1, 100);
        self
    }

    pub fn with_user_agent(mut self, agent: &str) -> Result<Self, HttpError> {
        self.user_agent = HeaderValue::from_str(agent).map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(self)
    }

    pub fn from_config(
        config: &RedditConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config.endpoint)?;
        Self::new(http, credentials)
            .with_listing(config.listing)
            .with_page_size(config.page_size)
            .with_user_agent(&config.user_agent)
    }

    async fn fetch_listing(
        &self,
        subreddit: &str,
        after: Option<&str>,
        token: &Secret,
    ) -> Result<Listing, HttpError> {
        let path = format!("r/{subreddit}/{}", self.listing.as_str());
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("limit", self.page_size.to_string().into()),
            ("raw_json", "1".into()),
        ];
        if self.listing == RedditListing::Top {
            params.push(("t", "all".into()));
        }
        if let Some(after) = after {
            params.push(("after", after.into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("user-agent"), self.user_agent.clone());

        self.http
            .get_json(
                &path,
                RequestOpts {
                    auth: Some(Auth::Bearer(token.expose())),
                    headers: Some(headers),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
    }

    fn page_from(&self, listing: Listing) -> Result<Page, SourceError> {
        let after = listing.data.after;
        let mut items = listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == POST_KIND)
            .map(|thing| thing.data.into_item())
            .collect::<Result<Vec<Item>, String>>()
            .map_err(SourceError::Malformed)?;

        if self.listing != RedditListing::New {
            items.sort_by_key(|item| Reverse(item.created_at));
            return Ok(Page::last(items));
        }
        if items.is_empty() {
            return Ok(Page::last(items));
        }
        Ok(Page::new(items, after.map(Cursor::new)))
    }
}

fn check_subreddit(entity: &EntityId) -> Result<&str, SourceError> {
    let name = entity.as_str().trim_start_matches("r/");
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(SourceError::Transport(format!("'{entity}' is not a subreddit name")));
    }
    Ok(name)
}

#[async_trait]
impl DataSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self, entity: &EntityId, cursor: Option<&Cursor>) -> Result<Page, SourceError> {
        let subreddit = check_subreddit(entity)?;
        let token = self
            .credentials
            .get()
            .await
            .map_err(upstream::credential_error)?;

        match self
            .fetch_listing(subreddit, cursor.map(Cursor::as_str), &token)
            .await
        {
            Ok(listing) => {
                tracing::debug!(
                    subreddit,
                    listing = self.listing.as_str(),
                    posts = listing.data.children.len(),
                    has_next = listing.data.after.is_some(),
                    "reddit.listing"
                );
                self.page_from(listing)
            }
            Err(err) => Err(upstream::throttled(self.name(), self.credentials.as_ref(), err).await),
        }
    }
}
