pub mod counts;
pub mod cursor;
pub mod pagination;
pub mod toggle;
pub mod watchlist;

pub use pagination::PageRequest;
pub use watchlist::WatchlistService;
