use crate::models::{Category, Counts, Entry};

use super::Coordinator;

/// What the list area shows
#[derive(Debug, Clone, PartialEq)]
pub enum Display {
    /// Nothing has ever been served
    Skeleton,
    /// Entries to render; `stale` while they belong to an older query
    Entries { entries: Vec<Entry>, stale: bool },
    /// The active search or category has no matches
    NoMatches,
    /// The collection itself is empty
    Empty,
}

/// Snapshot of everything the presentation layer needs
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub search_input: String,
    pub category: Option<Category>,
    pub display: Display,
    pub counts: Option<Counts>,
    pub has_more: bool,
    pub is_loading_more: bool,
    pub error: Option<String>,
    pub can_retry: bool,
}

impl Default for View {
    fn default() -> Self {
        Self {
            search_input: String::new(),
            category: None,
            display: Display::Skeleton,
            counts: None,
            has_more: false,
            is_loading_more: false,
            error: None,
            can_retry: false,
        }
    }
}

impl Coordinator {
    /// The "this collection has nothing at all" state
    ///
    /// Requires no search, no category, a served and finished empty result for
    /// that query, no fetch in flight and no pending input or requery.
    pub fn is_truly_empty(&self) -> bool {
        let key = self.query_key();
        key.is_unfiltered()
            && !self.is_typing()
            && !self.is_waiting()
            && !self.is_fetch_in_flight()
            && self
                .served
                .as_ref()
                .is_some_and(|served| served.key == key && served.entries.is_empty() && served.is_done)
    }

    pub fn display(&self) -> Display {
        let waiting = self.is_waiting();

        if waiting || self.is_typing() {
            if !self.initial_load_complete {
                return Display::Skeleton;
            }
            return Display::Entries {
                entries: self.previous_visible.clone(),
                stale: waiting,
            };
        }

        let Some(served) = self.served.as_ref() else {
            return Display::Skeleton;
        };

        if !served.entries.is_empty() {
            return Display::Entries {
                entries: served.entries.clone(),
                stale: false,
            };
        }

        if self.is_truly_empty() {
            Display::Empty
        } else if self.is_fetch_in_flight() || !served.is_done {
            Display::Entries {
                entries: Vec::new(),
                stale: true,
            }
        } else {
            Display::NoMatches
        }
    }

    pub fn view(&self) -> View {
        let key = self.query_key();
        let current = self.served.as_ref().filter(|served| served.key == key);

        View {
            search_input: self.raw_search.clone(),
            category: self.category,
            display: self.display(),
            counts: self.counts,
            has_more: current.is_some_and(|served| !served.is_done),
            is_loading_more: self
                .in_flight
                .as_ref()
                .is_some_and(|fetch| fetch.request.cursor.is_some()),
            error: self.last_error.clone(),
            can_retry: self.failed.is_some(),
        }
    }
}
