use crate::services::WatchlistService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub watchlist: WatchlistService,
}

impl AppState {
    pub fn new(watchlist: WatchlistService) -> Self {
        Self { watchlist }
    }

    /// State over an empty in-memory store, for local runs and tests
    pub fn in_memory() -> Self {
        Self::new(WatchlistService::in_memory())
    }
}
