use crate::{
    error::{AppError, AppResult},
    models::{EntryKey, OwnerId, Snapshot},
    store::CollectionStore,
};

/// Cleans a caller-supplied snapshot before it is stored
///
/// Snapshot contents are the caller's responsibility; only the shape needed
/// for search and display is checked here.
pub fn normalize_snapshot(key: EntryKey, snapshot: Snapshot) -> AppResult<Snapshot> {
    if key.external_id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "External id must be positive, got {}",
            key.external_id
        )));
    }

    let title = snapshot.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty".to_string()));
    }

    Ok(Snapshot {
        title,
        image_ref: non_blank(snapshot.image_ref),
        primary_date: non_blank(snapshot.primary_date),
        summary: non_blank(snapshot.summary),
        score: snapshot.score.filter(|s| s.is_finite()),
        score_count: snapshot.score_count.filter(|c| *c >= 0),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Adds the entry when absent, removes it when present
///
/// Returns whether the entry is present afterwards. Per-key serialization is
/// the store's job; this only validates and records the outcome.
pub async fn toggle_entry(
    store: &dyn CollectionStore,
    owner: &OwnerId,
    key: EntryKey,
    snapshot: Snapshot,
) -> AppResult<bool> {
    let snapshot = normalize_snapshot(key, snapshot)?;
    let present = store.toggle(owner, key, &snapshot).await?;

    tracing::info!(
        owner = %owner,
        category = %key.category,
        external_id = key.external_id,
        present,
        store = store.name(),
        "Toggled watchlist entry"
    );

    Ok(present)
}

/// Removes the owner's whole collection
pub async fn clear_entries(store: &dyn CollectionStore, owner: &OwnerId) -> AppResult<u64> {
    let removed = store.clear(owner).await.map_err(|e| {
        tracing::error!(owner = %owner, error = %e, "Failed to clear watchlist");
        e
    })?;

    tracing::info!(owner = %owner, removed, "Cleared watchlist");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::store::MemoryStore;
    use crate::test_support::owner;

    #[test]
    fn test_normalize_trims_and_drops_blank_fields() {
        let snapshot = Snapshot {
            title: "  Heat ".to_string(),
            image_ref: Some("   ".to_string()),
            primary_date: Some("1995-12-15".to_string()),
            summary: Some(String::new()),
            score: Some(f64::NAN),
            score_count: Some(-3),
        };

        let normalized = normalize_snapshot(EntryKey::new(Category::Movie, 949), snapshot).unwrap();
        assert_eq!(normalized.title, "Heat");
        assert_eq!(normalized.image_ref, None);
        assert_eq!(normalized.primary_date.as_deref(), Some("1995-12-15"));
        assert_eq!(normalized.summary, None);
        assert_eq!(normalized.score, None);
        assert_eq!(normalized.score_count, None);
    }

    #[test]
    fn test_normalize_rejects_blank_title() {
        let result = normalize_snapshot(EntryKey::new(Category::Movie, 1), Snapshot::titled("  "));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_rejects_non_positive_id() {
        let result = normalize_snapshot(EntryKey::new(Category::Tv, 0), Snapshot::titled("x"));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_toggle_pair_returns_true_then_false() {
        let store = MemoryStore::new();
        let alice = owner("alice");
        let key = EntryKey::new(Category::Tv, 1396);

        let first = toggle_entry(&store, &alice, key, Snapshot::titled("Breaking Bad"))
            .await
            .unwrap();
        let second = toggle_entry(&store, &alice, key, Snapshot::titled("Breaking Bad"))
            .await
            .unwrap();

        assert_eq!((first, second), (true, false));
        assert!(store.scan(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_toggle_changes_nothing() {
        let store = MemoryStore::new();
        let alice = owner("alice");

        let result =
            toggle_entry(&store, &alice, EntryKey::new(Category::Tv, 5), Snapshot::default()).await;

        assert!(result.is_err());
        assert!(store.scan(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_reports_removed_count() {
        let store = MemoryStore::new();
        let alice = owner("alice");
        for id in 1..=4 {
            toggle_entry(
                &store,
                &alice,
                EntryKey::new(Category::Movie, id),
                Snapshot::titled("x"),
            )
            .await
            .unwrap();
        }

        assert_eq!(clear_entries(&store, &alice).await.unwrap(), 4);
        assert!(store.scan(&alice).await.unwrap().is_empty());
    }
}
