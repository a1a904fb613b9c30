use backscroll_engine::{Engagement, Item};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `creation_date` layout, e.g. `Mon Sep 02 14:05:11 +0000 2024`.
pub const CREATION_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Body of `/user/tweets` and `/user/tweets/continuation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineResponse {
    #[serde(default)]
    pub results: Option<Vec<Tweet>>,
    #[serde(default)]
    pub continuation_token: Option<String>,
    /// Present on error payloads that still come back with 200.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub tweet_id: String,
    pub creation_date: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: Option<TweetUser>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub favorite_count: Option<u64>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub views: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetUser {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

pub fn parse_creation_date(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(raw, CREATION_DATE_FORMAT).map(|t| t.with_timezone(&Utc))
}

impl Tweet {
    /// `fallback_author` is used when the payload omits the user block.
    pub fn into_item(self, fallback_author: &str) -> Result<Item, String> {
        let created_at = parse_creation_date(&self.creation_date)
            .map_err(|e| format!("tweet {}: bad creation_date {:?}: {e}", self.tweet_id, self.creation_date))?;
        Ok(Item {
            id: self.tweet_id,
            author: self
                .user
                .map(|u| u.username)
                .unwrap_or_else(|| fallback_author.to_string()),
            text: self.text,
            created_at,
            engagement: Engagement {
                likes: self.favorite_count,
                reposts: self.retweet_count,
                replies: self.reply_count,
                views: self.views,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn parses_rapidapi_dates_with_offset() {
        let t = parse_creation_date("Mon Sep 02 14:05:11 +0200 2024").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 9, 2, 12, 5, 11).unwrap());
        assert!(parse_creation_date("2024-09-02T14:05:11Z").is_err());
    }

    #[test]
    fn tweet_maps_to_item() {
        let tweet: Tweet = serde_json::from_value(json!({
            "tweet_id": "1830",
            "creation_date": "Mon Sep 02 14:05:11 +0000 2024",
            "text": "Source: [DB] Coins: BTC",
            "user": { "username": "feed", "name": "Feed" },
            "favorite_count": 4,
            "retweet_count": 1,
            "reply_count": 0,
            "views": null
        }))
        .unwrap();
        let item = tweet.into_item("fallback").unwrap();
        assert_eq!(item.id, "1830");
        assert_eq!(item.author, "feed");
        assert_eq!(item.engagement.likes, Some(4));
        assert_eq!(item.engagement.views, None);
    }

    #[test]
    fn missing_user_uses_fallback() {
        let tweet: Tweet = serde_json::from_value(json!({
            "tweet_id": "1",
            "creation_date": "Mon Sep 02 14:05:11 +0000 2024",
        }))
        .unwrap();
        assert_eq!(tweet.into_item("acct").unwrap().author, "acct");
    }
}
