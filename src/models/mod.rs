mod entry;
mod page;

pub use entry::{Category, Entry, EntryKey, OwnerId, Position, Snapshot};
pub use page::{BucketCounts, Counts, Page};
