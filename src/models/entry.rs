use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Opaque identity of the collection owner
///
/// Authentication happens upstream; the only thing checked here is that the
/// token is not blank, so every core operation receives a usable partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn parse(token: &str) -> Result<Self, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media an entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    Tv,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Movie, Category::Tv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Tv => "tv",
        }
    }

    /// Parses a category filter where `all` (or nothing) means "no filter"
    pub fn parse_filter(value: Option<&str>) -> Result<Option<Self>, AppError> {
        match value.map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(other) => other.parse().map(Some),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(Category::Movie),
            "tv" => Ok(Category::Tv),
            other => Err(AppError::InvalidInput(format!("Unknown category: {}", other))),
        }
    }
}

/// Identity of an entry within one owner's collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub category: Category,
    pub external_id: i64,
}

impl EntryKey {
    pub fn new(category: Category, external_id: i64) -> Self {
        Self {
            category,
            external_id,
        }
    }
}

impl Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.external_id)
    }
}

/// Display fields captured when the entry is added; never refreshed afterwards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: String,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub primary_date: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub score_count: Option<i64>,
}

impl Snapshot {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Position of an entry in the owner's recency order
///
/// Ordered by `added_at` first and insertion sequence second, which makes
/// the order total even when two entries share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub added_at_micros: i64,
    pub seq: i64,
}

/// One kept item in an owner's watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub owner: OwnerId,
    pub category: Category,
    pub external_id: i64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub seq: i64,
}

impl Entry {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.category, self.external_id)
    }

    pub fn position(&self) -> Position {
        Position {
            added_at_micros: self.added_at.timestamp_micros(),
            seq: self.seq,
        }
    }

    pub fn title(&self) -> &str {
        &self.snapshot.title
    }
}
