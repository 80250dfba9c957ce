//! Client-side query coordination for the list view
//!
//! The [`Coordinator`] is a pure state machine; [`runtime`] drives it against a
//! backend on a tokio task.

mod debounce;
pub mod runtime;
mod state;
mod view;

pub use debounce::Debouncer;
pub use runtime::{spawn, CoordinatorHandle, OwnerBackend, WatchlistBackend};
pub use state::{
    Coordinator, CoordinatorConfig, Effect, Event, PageFetch, QueryKey, Ticket, DEFAULT_DEBOUNCE,
    DEFAULT_PAGE_SIZE, DEFAULT_SCROLL_THRESHOLD,
};
pub use view::{Display, View};
