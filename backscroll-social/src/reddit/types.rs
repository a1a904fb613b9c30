use backscroll_engine::{Engagement, Item};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope of `/r/<subreddit>/<listing>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub kind: Option<String>,
    pub data: ListingData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingData {
    /// Fullname of the last post; `None` once the listing is exhausted.
    #[serde(default)]
    pub after: Option<String>,
    pub children: Vec<Thing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    pub created_utc: f64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Post {
    /// Title and self text joined; deleted authors become `[deleted]`.
    pub fn into_item(self) -> Result<Item, String> {
        let created_at = timestamp(self.created_utc)
            .ok_or_else(|| format!("post {}: bad created_utc {}", self.id, self.created_utc))?;

        let body = self.selftext.trim();
        let text = if body.is_empty() {
            self.title
        } else {
            format!("{}\n\n{body}", self.title)
        };

        Ok(Item {
            id: self.id,
            author: self.author.unwrap_or_else(|| "[deleted]".into()),
            text,
            created_at,
            engagement: Engagement {
                likes: u64::try_from(self.score).ok(),
                replies: Some(self.num_comments),
                ..Engagement::default()
            },
        })
    }
}

fn timestamp(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9) as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
}
