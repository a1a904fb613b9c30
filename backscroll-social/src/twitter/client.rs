//! Thin wrapper over the Twitter154 (RapidAPI) user-timeline endpoints.
//!
//! The first page comes from `user/tweets`; every later page from
//! `user/tweets/continuation` with the token the previous page returned.
use crate::credentials::Secret;
use crate::twitter::types::TimelineResponse;
use backscroll_http::{Auth, HeaderMap, HeaderName, HeaderValue, HttpClient, HttpError, RequestOpts};
use std::borrow::Cow;

pub const DEFAULT_ENDPOINT: &str = "https://twitter154.p.rapidapi.com";
const KEY_HEADER: &str = "x-rapidapi-key";
const HOST_HEADER: &str = "x-rapidapi-host";

#[derive(Clone)]
pub struct Twitter154Api {
    http: HttpClient,
    host: String,
    include_replies: bool,
    page_size: u32,
}

impl Twitter154Api {
    pub fn new(endpoint: &str) -> Result<Self, HttpError> {
        let http = HttpClient::new(endpoint)?;
        let host = http.base().host_str().unwrap_or_default().to_string();
        Ok(Self {
            http,
            host,
            include_replies: false,
            page_size: 100,
        })
    }

    pub fn with_include_replies(mut self, include: bool) -> Self {
        self.include_replies = include;
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Swap the underlying client (tests shorten backoff this way).
    pub fn with_http(mut self, http: HttpClient) -> Self {
        self.host = http.base().host_str().unwrap_or_default().to_string();
        self.http = http;
        self
    }

    pub async fn timeline(
        &self,
        username: &str,
        continuation: Option<&str>,
        key: &Secret,
    ) -> Result<TimelineResponse, HttpError> {
        let path = match continuation {
            Some(_) => "user/tweets/continuation",
            None => "user/tweets",
        };

        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("username", username.into()),
            ("limit", self.page_size.to_string().into()),
            ("include_replies", Cow::Borrowed(bool_param(self.include_replies))),
        ];
        if let Some(token) = continuation {
            params.push(("continuation_token", token.into()));
        }

        let mut key_value =
            HeaderValue::from_str(key.expose()).map_err(|e| HttpError::Build(e.to_string()))?;
        key_value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        if let Ok(host) = HeaderValue::from_str(&self.host) {
            headers.insert(HeaderName::from_static(HOST_HEADER), host);
        }

        let resp: TimelineResponse = self
            .http
            .get_json(
                path,
                RequestOpts {
                    auth: Some(Auth::Header {
                        name: HeaderName::from_static(KEY_HEADER),
                        value: key_value,
                    }),
                    headers: Some(headers),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await?;

        tracing::debug!(
            username,
            continuation = continuation.is_some(),
            results = ?resp.results.as_ref().map(Vec::len),
            has_next = resp.continuation_token.is_some(),
            "twitter154.timeline"
        );
        Ok(resp)
    }
}

fn bool_param(v: bool) -> &'static str {
    if v { "true" } else { "false" }
}
