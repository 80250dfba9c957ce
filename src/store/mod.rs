/// Collection store abstraction
///
/// A store persists every owner's watchlist entries and is the single place
/// where the (owner, category, external id) uniqueness rule is enforced.
/// Implementations must run `toggle` as a serializable check-then-act per key:
/// two racing toggles on the same key never both insert and never error.
use crate::{
    error::AppResult,
    models::{Entry, EntryKey, OwnerId, Position, Snapshot},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait::async_trait]
pub trait CollectionStore: Send + Sync {
    /// Removes the entry if present, otherwise inserts it stamped with the
    /// current time. Returns whether the entry is present afterwards.
    async fn toggle(&self, owner: &OwnerId, key: EntryKey, snapshot: &Snapshot)
        -> AppResult<bool>;

    /// Deletes every entry of the owner as one unit and returns how many went away
    async fn clear(&self, owner: &OwnerId) -> AppResult<u64>;

    /// Whether the owner currently keeps the entry
    async fn contains(&self, owner: &OwnerId, key: EntryKey) -> AppResult<bool>;

    /// Walks the recency index: up to `limit` entries strictly older than
    /// `after` (or the newest ones when `after` is `None`), newest first.
    async fn page_after(
        &self,
        owner: &OwnerId,
        after: Option<Position>,
        limit: usize,
    ) -> AppResult<Vec<Entry>>;

    /// Every entry of the owner, newest first
    async fn scan(&self, owner: &OwnerId) -> AppResult<Vec<Entry>>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}
