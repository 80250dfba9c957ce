use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::{
    coordinator::Debouncer,
    models::{Category, Counts, Entry, EntryKey, Page},
    services::{cursor, pagination::PageRequest},
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_SCROLL_THRESHOLD: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Input silence required before a search is issued
    pub debounce: Duration,
    pub page_size: usize,
    /// Scrolled fraction of the list that triggers the next page
    pub scroll_threshold: f32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
        }
    }
}

/// Identifies one distinct result set: debounced search text plus category tab
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub search: String,
    pub category: Option<Category>,
}

impl QueryKey {
    pub fn new(search: &str, category: Option<Category>) -> Self {
        Self {
            search: search.trim().to_string(),
            category,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.search.is_empty() && self.category.is_none()
    }

    fn search_param(&self) -> Option<String> {
        (!self.search.is_empty()).then(|| self.search.clone())
    }
}

/// Tag attached to every page request and echoed back with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: QueryKey,
    pub generation: u64,
    pub request: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageFetch {
    pub ticket: Ticket,
    pub request: PageRequest,
}

/// Inputs to the coordinator
#[derive(Debug, Clone)]
pub enum Event {
    /// The list view mounted; issues the first query
    Started,
    SearchInput {
        text: String,
        at: Instant,
    },
    /// The debounce deadline passed
    DebounceElapsed {
        now: Instant,
    },
    CategorySelected(Option<Category>),
    /// Scroll position as a fraction of the scrollable distance
    Scrolled {
        fraction: f32,
    },
    PageLoaded {
        ticket: Ticket,
        page: Page,
    },
    PageFailed {
        ticket: Ticket,
        error: String,
    },
    CountsLoaded {
        ticket: u64,
        counts: Counts,
    },
    CountsFailed {
        ticket: u64,
        error: String,
    },
    /// A toggle issued from the list view completed
    EntryToggled {
        key: EntryKey,
        present: bool,
    },
    RetryRequested,
}

/// Work the coordinator asks its driver to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchPage(PageFetch),
    FetchCounts {
        ticket: u64,
        search: Option<String>,
    },
    /// Restart the single debounce timer so it fires at `deadline`
    ScheduleDebounce {
        deadline: Instant,
    },
}

/// Pages accumulated for the last query key that got a response
#[derive(Debug, Clone)]
pub(super) struct Served {
    pub(super) key: QueryKey,
    pub(super) entries: Vec<Entry>,
    pub(super) next_cursor: Option<String>,
    pub(super) is_done: bool,
}

/// Reducer that owns the list view's query state
///
/// Every transition is `update(event) -> effects`; nothing here performs I/O.
/// Responses carry the ticket they were issued with and are applied only while
/// that ticket is still the one in flight for the current query key, which
/// stands in for cancelling superseded requests.
#[derive(Debug, Clone)]
pub struct Coordinator {
    pub(super) config: CoordinatorConfig,
    pub(super) raw_search: String,
    debouncer: Debouncer<String>,
    pub(super) debounced_search: String,
    pub(super) category: Option<Category>,
    generation: u64,
    request_seq: u64,
    requested_key: Option<QueryKey>,
    pub(super) served: Option<Served>,
    pub(super) previous_visible: Vec<Entry>,
    pub(super) initial_load_complete: bool,
    pub(super) in_flight: Option<PageFetch>,
    pub(super) failed: Option<PageFetch>,
    pub(super) last_error: Option<String>,
    pub(super) counts: Option<Counts>,
    counts_ticket: u64,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce),
            config,
            raw_search: String::new(),
            debounced_search: String::new(),
            category: None,
            generation: 0,
            request_seq: 0,
            requested_key: None,
            served: None,
            previous_visible: Vec::new(),
            initial_load_complete: false,
            in_flight: None,
            failed: None,
            last_error: None,
            counts: None,
            counts_ticket: 0,
        }
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(&self.debounced_search, self.category)
    }

    /// Input typed but not yet debounced into a query
    pub fn is_typing(&self) -> bool {
        self.raw_search.trim() != self.debounced_search.trim()
    }

    /// Nothing has been served yet for the current key
    ///
    /// This also covers a first fetch for the key being in flight.
    pub fn is_waiting(&self) -> bool {
        self.served
            .as_ref()
            .map_or(true, |served| served.key != self.query_key())
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn counts(&self) -> Option<Counts> {
        self.counts
    }

    pub fn update(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Started => {
                let mut effects = self.sync_query();
                effects.push(self.request_counts());
                effects
            }
            Event::SearchInput { text, at } => {
                self.raw_search = text.clone();
                let deadline = self.debouncer.schedule(text, at);
                vec![Effect::ScheduleDebounce { deadline }]
            }
            Event::DebounceElapsed { now } => {
                let Some(text) = self.debouncer.poll(now) else {
                    return Vec::new();
                };
                let search_changed = text.trim() != self.debounced_search.trim();
                self.debounced_search = text;

                let mut effects = self.sync_query();
                if search_changed {
                    effects.push(self.request_counts());
                }
                effects
            }
            Event::CategorySelected(category) => {
                self.category = category;
                self.sync_query()
            }
            Event::Scrolled { fraction } => self.load_more(fraction).into_iter().collect(),
            Event::PageLoaded { ticket, page } => self.apply_page(ticket, page),
            Event::PageFailed { ticket, error } => {
                self.fail_page(ticket, error);
                Vec::new()
            }
            Event::CountsLoaded { ticket, counts } => {
                if ticket != self.counts_ticket {
                    return Vec::new();
                }
                let previous = self.counts.replace(counts);
                self.reset_empty_category(previous)
            }
            Event::CountsFailed { ticket, error } => {
                if ticket == self.counts_ticket {
                    tracing::warn!(error = %error, "Counts refresh failed, keeping previous counts");
                }
                Vec::new()
            }
            Event::EntryToggled { key, present } => self.reconcile_toggle(key, present),
            Event::RetryRequested => self.retry(),
        }
    }

    /// Starts a new generation when the query key moved away from the last request
    fn sync_query(&mut self) -> Vec<Effect> {
        let key = self.query_key();
        if self.requested_key.as_ref() == Some(&key) {
            return Vec::new();
        }

        self.generation += 1;
        self.requested_key = Some(key);
        self.failed = None;
        self.last_error = None;
        vec![self.issue(None)]
    }

    fn issue(&mut self, cursor: Option<String>) -> Effect {
        self.request_seq += 1;
        let key = self.query_key();
        let fetch = PageFetch {
            request: PageRequest {
                search: key.search_param(),
                category: key.category,
                cursor,
                page_size: self.config.page_size,
            },
            ticket: Ticket {
                key,
                generation: self.generation,
                request: self.request_seq,
            },
        };
        self.in_flight = Some(fetch.clone());
        Effect::FetchPage(fetch)
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
            && ticket.key == self.query_key()
            && self
                .in_flight
                .as_ref()
                .is_some_and(|fetch| &fetch.ticket == ticket)
    }

    fn apply_page(&mut self, ticket: Ticket, page: Page) -> Vec<Effect> {
        if !self.is_current(&ticket) {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                "Dropping superseded page"
            );
            return Vec::new();
        }

        let appending = self
            .in_flight
            .take()
            .is_some_and(|fetch| fetch.request.cursor.is_some());

        let extends_served =
            appending && self.served.as_ref().is_some_and(|s| s.key == ticket.key);

        if extends_served {
            if let Some(served) = self.served.as_mut() {
                let seen: HashSet<EntryKey> = served.entries.iter().map(Entry::key).collect();
                served
                    .entries
                    .extend(page.page.into_iter().filter(|e| !seen.contains(&e.key())));
                served.next_cursor = page.next_cursor;
                served.is_done = page.is_done;
            }
        } else {
            // A first page replaces whatever an older key accumulated
            self.served = Some(Served {
                key: ticket.key,
                entries: page.page,
                next_cursor: page.next_cursor,
                is_done: page.is_done,
            });
        }

        self.initial_load_complete = true;
        self.failed = None;
        self.last_error = None;
        if let Some(served) = &self.served {
            self.previous_visible = served.entries.clone();
        }

        self.refill_if_drained()
    }

    fn fail_page(&mut self, ticket: Ticket, error: String) {
        if !self.is_current(&ticket) {
            return;
        }
        tracing::warn!(error = %error, "Page fetch failed, keeping served results");
        self.failed = self.in_flight.take();
        self.last_error = Some(error);
    }

    fn retry(&mut self) -> Vec<Effect> {
        let Some(failed) = self.failed.take() else {
            return Vec::new();
        };
        if failed.ticket.generation != self.generation || failed.ticket.key != self.query_key() {
            return Vec::new();
        }
        self.last_error = None;
        vec![self.issue(failed.request.cursor)]
    }

    fn load_more(&mut self, fraction: f32) -> Option<Effect> {
        if fraction < self.config.scroll_threshold || self.in_flight.is_some() {
            return None;
        }
        let key = self.query_key();
        let served = self.served.as_ref()?;
        if served.key != key || served.is_done {
            return None;
        }
        let cursor = served.next_cursor.clone()?;
        Some(self.issue(Some(cursor)))
    }

    fn request_counts(&mut self) -> Effect {
        self.counts_ticket += 1;
        Effect::FetchCounts {
            ticket: self.counts_ticket,
            search: self.query_key().search_param(),
        }
    }

    /// Falls back to the "all" tab when the selected category's total drops to zero
    ///
    /// A tab that was already empty when it was selected stays selected.
    fn reset_empty_category(&mut self, previous: Option<Counts>) -> Vec<Effect> {
        let (Some(category), Some(counts), Some(previous)) = (self.category, self.counts, previous)
        else {
            return Vec::new();
        };
        if counts.total.get(Some(category)) > 0 || previous.total.get(Some(category)) == 0 {
            return Vec::new();
        }

        tracing::debug!(category = %category, "Active category emptied, resetting to all");
        self.category = None;
        self.sync_query()
    }

    fn reconcile_toggle(&mut self, key: EntryKey, present: bool) -> Vec<Effect> {
        let mut effects = Vec::new();

        if present {
            // New entries sort first, so the current key is reloaded from the top
            self.requested_key = None;
            effects.extend(self.sync_query());
        } else {
            if let Some(served) = self.served.as_mut() {
                let loaded = served.entries.len();
                served.entries.retain(|e| e.key() != key);

                // Offset cursors count entries; the store no longer has this one
                if served.entries.len() < loaded && !served.key.is_unfiltered() {
                    if let Some(shifted) = served
                        .next_cursor
                        .as_deref()
                        .and_then(|c| cursor::shift_offset(c, -1))
                    {
                        served.next_cursor = Some(shifted);
                    }
                }
            }
            self.previous_visible.retain(|e| e.key() != key);
            effects.extend(self.refill_if_drained());
        }

        effects.push(self.request_counts());
        effects
    }

    /// Pulls the next page when local removals emptied a list that has more behind it
    fn refill_if_drained(&mut self) -> Vec<Effect> {
        let drained = self.in_flight.is_none()
            && self.served.as_ref().is_some_and(|served| {
                served.key == self.query_key()
                    && served.entries.is_empty()
                    && !served.is_done
                    && served.next_cursor.is_some()
            });
        if !drained {
            return Vec::new();
        }

        let cursor = self.served.as_ref().and_then(|s| s.next_cursor.clone());
        vec![self.issue(cursor)]
    }
}
