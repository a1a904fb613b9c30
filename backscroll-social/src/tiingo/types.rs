use backscroll_engine::{Engagement, Item};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One element of the `/tiingo/news` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub published_date: String,
    #[serde(default)]
    pub crawl_date: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewsArticle {
    /// Title and description joined; author is the publishing domain.
    pub fn into_item(self) -> Result<Item, String> {
        let created_at = DateTime::parse_from_rfc3339(&self.published_date)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                format!(
                    "article {}: bad publishedDate {:?}: {e}",
                    self.id, self.published_date
                )
            })?;

        let text = match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => format!("{}\n\n{desc}", self.title),
            _ => self.title,
        };

        Ok(Item {
            id: self.id.to_string(),
            author: self.source.unwrap_or_else(|| "tiingo".into()),
            text,
            created_at,
            engagement: Engagement::default(),
        })
    }
}
