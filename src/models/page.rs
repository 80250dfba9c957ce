use serde::{Deserialize, Serialize};

use super::{Category, Entry};

/// One page of a watchlist query plus its continuation token
///
/// `next_cursor` is opaque to callers and only valid for the same
/// search/category pair that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page: Vec<Entry>,
    pub is_done: bool,
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn done(page: Vec<Entry>) -> Self {
        Self {
            page,
            is_done: true,
            next_cursor: None,
        }
    }
}

/// Per-category entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub all: u64,
    pub movie: u64,
    pub tv: u64,
}

impl BucketCounts {
    pub fn record(&mut self, category: Category) {
        self.all += 1;
        match category {
            Category::Movie => self.movie += 1,
            Category::Tv => self.tv += 1,
        }
    }

    /// Count for a tab, where `None` is the "all" tab
    pub fn get(&self, category: Option<Category>) -> u64 {
        match category {
            None => self.all,
            Some(Category::Movie) => self.movie,
            Some(Category::Tv) => self.tv,
        }
    }
}

/// Counts restricted to the search text alongside the unrestricted totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub filtered: BucketCounts,
    pub total: BucketCounts,
}
