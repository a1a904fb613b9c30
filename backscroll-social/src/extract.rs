//! Pull the source tag and coin list out of alert-style posts such as
//! `"Binance lists XYZ Source: [DB] Coins: XYZ, BTC"`.
//!
//! Posts that start with a link carry no structured fields and yield neither.
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

pub const DEFAULT_SOURCE_TAG: &str = "DB";

static DEFAULT: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::new(DEFAULT_SOURCE_TAG).expect("default extractor patterns compile")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extracted {
    pub timestamp: String,
    pub text: String,
    pub source: Option<String>,
    pub coins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    source: Regex,
    coins: Regex,
}

impl Extractor {
    /// `tag` is matched literally, optionally wrapped in brackets.
    pub fn new(tag: &str) -> Result<Self, regex::Error> {
        let source = Regex::new(&format!(r"Source:\s*(\[?{}\]?)", regex::escape(tag)))?;
        let coins = Regex::new(r"Coins:\s*([\w\s,]+)")?;
        Ok(Self { source, coins })
    }

    pub fn extract(&self, timestamp: impl Into<String>, text: &str) -> Extracted {
        let mut out = Extracted {
            timestamp: timestamp.into(),
            text: text.to_string(),
            source: None,
            coins: Vec::new(),
        };
        if text.starts_with("http") {
            return out;
        }

        out.source = self
            .source
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches(['[', ']']).to_string());

        if let Some(list) = self.coins.captures(text).and_then(|c| c.get(1)) {
            out.coins = list
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }
        out
    }
}

/// Extract with the default `DB` source tag.
pub fn extract(timestamp: impl Into<String>, text: &str) -> Extracted {
    DEFAULT.extract(timestamp, text)
}
