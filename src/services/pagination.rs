use crate::{
    error::AppResult,
    models::{Category, Entry, OwnerId, Page},
    services::cursor,
    store::CollectionStore,
};

/// Parameters of one watchlist page request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub cursor: Option<String>,
    pub page_size: usize,
}

/// Search and category predicates applied in memory
///
/// The search text is trimmed and lowercased once; a blank search is no search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    search: Option<String>,
    category: Option<Category>,
}

impl EntryFilter {
    pub fn new(search: Option<&str>, category: Option<Category>) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        Self { search, category }
    }

    pub fn is_active(&self) -> bool {
        self.search.is_some() || self.category.is_some()
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    pub fn matches_search(&self, entry: &Entry) -> bool {
        match &self.search {
            Some(needle) => entry.title().to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.category.map_or(true, |c| entry.category == c) && self.matches_search(entry)
    }
}

/// How a page is produced
///
/// Without filters the store's recency index is walked directly and a page
/// costs O(page size). Any filter falls back to scanning the whole collection
/// and slicing the filtered list by offset, which costs O(collection size)
/// per page because substring search has no supporting index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePlan {
    Indexed,
    Scan(EntryFilter),
}

impl PagePlan {
    pub fn for_filter(filter: EntryFilter) -> Self {
        if filter.is_active() {
            PagePlan::Scan(filter)
        } else {
            PagePlan::Indexed
        }
    }

    pub async fn fetch(
        &self,
        store: &dyn CollectionStore,
        owner: &OwnerId,
        cursor: Option<&str>,
        page_size: usize,
    ) -> AppResult<Page> {
        match self {
            PagePlan::Indexed => fetch_indexed(store, owner, cursor, page_size).await,
            PagePlan::Scan(filter) => {
                let entries = store.scan(owner).await?;
                Ok(slice_filtered(entries, filter, cursor, page_size))
            }
        }
    }
}

async fn fetch_indexed(
    store: &dyn CollectionStore,
    owner: &OwnerId,
    cursor: Option<&str>,
    page_size: usize,
) -> AppResult<Page> {
    let after = cursor::decode_position(cursor);

    // One extra row tells whether anything follows this page
    let mut entries = store
        .page_after(owner, after, page_size.saturating_add(1))
        .await?;

    // Nothing older than the cursor: it points past the end of the list
    if entries.is_empty() && after.is_some() {
        tracing::debug!(owner = %owner, "Position cursor past end of list, restarting");
        entries = store
            .page_after(owner, None, page_size.saturating_add(1))
            .await?;
    }

    if entries.len() <= page_size {
        return Ok(Page::done(entries));
    }

    entries.truncate(page_size);
    let next_cursor = entries.last().map(|e| cursor::encode_position(e.position()));

    Ok(Page {
        page: entries,
        is_done: false,
        next_cursor,
    })
}

/// Filters a newest-first scan and cuts out the page the offset cursor points at
pub fn slice_filtered(
    entries: Vec<Entry>,
    filter: &EntryFilter,
    cursor: Option<&str>,
    page_size: usize,
) -> Page {
    let filtered: Vec<Entry> = entries.into_iter().filter(|e| filter.matches(e)).collect();
    let len = filtered.len();
    let offset = cursor::decode_offset(cursor, len);
    let end = offset.saturating_add(page_size);
    let is_done = end >= len;

    let page = filtered.into_iter().skip(offset).take(page_size).collect();

    Page {
        page,
        is_done,
        next_cursor: (!is_done).then(|| cursor::encode_offset(end)),
    }
}

/// Runs a page request against the owner's collection
pub async fn query(
    store: &dyn CollectionStore,
    owner: &OwnerId,
    request: &PageRequest,
) -> AppResult<Page> {
    let plan = PagePlan::for_filter(EntryFilter::new(
        request.search.as_deref(),
        request.category,
    ));

    let page = plan
        .fetch(store, owner, request.cursor.as_deref(), request.page_size)
        .await?;

    tracing::debug!(
        owner = %owner,
        indexed = matches!(plan, PagePlan::Indexed),
        page_size = request.page_size,
        returned = page.page.len(),
        is_done = page.is_done,
        "Served watchlist page"
    );

    Ok(page)
}
