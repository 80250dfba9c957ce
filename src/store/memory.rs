use chrono::{DateTime, SubsecRound, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{Entry, EntryKey, OwnerId, Position, Snapshot},
    store::CollectionStore,
};

/// One owner's entries, indexed by recency and by key
#[derive(Default)]
struct Shelf {
    by_position: BTreeMap<Position, Entry>,
    by_key: HashMap<EntryKey, Position>,
}

#[derive(Default)]
struct Inner {
    shelves: HashMap<OwnerId, Shelf>,
    next_seq: i64,
    last_added_at: Option<DateTime<Utc>>,
}

impl Inner {
    /// Wall-clock time truncated to the precision Postgres keeps, never
    /// earlier than the previous assignment
    fn next_added_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let added_at = match self.last_added_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_added_at = Some(added_at);
        added_at
    }
}

/// In-process store with the same semantics as the Postgres store
///
/// Writers take the exclusive lock for the whole check-then-act, readers share it.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CollectionStore for MemoryStore {
    async fn toggle(
        &self,
        owner: &OwnerId,
        key: EntryKey,
        snapshot: &Snapshot,
    ) -> AppResult<bool> {
        let mut inner = self.inner.write().await;

        if let Some(shelf) = inner.shelves.get_mut(owner) {
            if let Some(position) = shelf.by_key.remove(&key) {
                shelf.by_position.remove(&position);
                if shelf.by_key.is_empty() {
                    inner.shelves.remove(owner);
                }
                return Ok(false);
            }
        }

        inner.next_seq += 1;
        let seq = inner.next_seq;
        let added_at = inner.next_added_at();
        let entry = Entry {
            owner: owner.clone(),
            category: key.category,
            external_id: key.external_id,
            snapshot: snapshot.clone(),
            added_at,
            seq,
        };
        let position = entry.position();

        let shelf = inner.shelves.entry(owner.clone()).or_default();
        shelf.by_key.insert(key, position);
        shelf.by_position.insert(position, entry);

        Ok(true)
    }

    async fn clear(&self, owner: &OwnerId) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .shelves
            .remove(owner)
            .map(|shelf| shelf.by_position.len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }

    async fn contains(&self, owner: &OwnerId, key: EntryKey) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .shelves
            .get(owner)
            .is_some_and(|shelf| shelf.by_key.contains_key(&key)))
    }

    async fn page_after(
        &self,
        owner: &OwnerId,
        after: Option<Position>,
        limit: usize,
    ) -> AppResult<Vec<Entry>> {
        let inner = self.inner.read().await;
        let Some(shelf) = inner.shelves.get(owner) else {
            return Ok(Vec::new());
        };

        let entries = match after {
            Some(position) => shelf
                .by_position
                .range(..position)
                .rev()
                .take(limit)
                .map(|(_, entry)| entry.clone())
                .collect(),
            None => shelf
                .by_position
                .values()
                .rev()
                .take(limit)
                .cloned()
                .collect(),
        };

        Ok(entries)
    }

    async fn scan(&self, owner: &OwnerId) -> AppResult<Vec<Entry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .shelves
            .get(owner)
            .map(|shelf| shelf.by_position.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
