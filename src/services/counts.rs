use crate::{
    error::AppResult,
    models::{Counts, Entry, OwnerId},
    services::pagination::EntryFilter,
    store::CollectionStore,
};

/// Tallies totals and search-restricted counts in one pass over the entries
///
/// The category is deliberately not an input: tab labels need every bucket,
/// whichever tab is selected.
pub fn tally<'a>(entries: impl IntoIterator<Item = &'a Entry>, search: Option<&str>) -> Counts {
    let filter = EntryFilter::new(search, None);
    let mut counts = Counts::default();

    for entry in entries {
        counts.total.record(entry.category);
        if filter.matches_search(entry) {
            counts.filtered.record(entry.category);
        }
    }

    counts
}

/// Counts an owner's collection with a single scan
pub async fn count_entries(
    store: &dyn CollectionStore,
    owner: &OwnerId,
    search: Option<&str>,
) -> AppResult<Counts> {
    let entries = store.scan(owner).await?;
    let counts = tally(&entries, search);

    tracing::debug!(
        owner = %owner,
        total = counts.total.all,
        filtered = counts.filtered.all,
        "Counted watchlist entries"
    );

    Ok(counts)
}
