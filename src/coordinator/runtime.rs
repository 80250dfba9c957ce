//! Drives a [`Coordinator`] on a tokio task
//!
//! Commands from the presentation layer and backend responses are fed through
//! the reducer one at a time; every resulting view is published on a watch
//! channel. Backend calls run on their own tasks.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

use crate::{
    error::{AppError, AppResult},
    models::{Category, Counts, EntryKey, OwnerId, Page, Snapshot},
    services::{PageRequest, WatchlistService},
};

use super::{Coordinator, CoordinatorConfig, Effect, Event, View};

/// Data access the coordinator needs, already scoped to one owner
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WatchlistBackend: Send + Sync + 'static {
    async fn query(&self, request: PageRequest) -> AppResult<Page>;
    async fn counts(&self, search: Option<String>) -> AppResult<Counts>;
    async fn toggle(&self, key: EntryKey, snapshot: Snapshot) -> AppResult<bool>;
}

/// Backend that calls the service in-process on behalf of one owner
#[derive(Clone)]
pub struct OwnerBackend {
    service: WatchlistService,
    owner: OwnerId,
}

impl OwnerBackend {
    pub fn new(service: WatchlistService, owner: OwnerId) -> Self {
        Self { service, owner }
    }
}

#[async_trait::async_trait]
impl WatchlistBackend for OwnerBackend {
    async fn query(&self, request: PageRequest) -> AppResult<Page> {
        self.service.query(&self.owner, &request).await
    }

    async fn counts(&self, search: Option<String>) -> AppResult<Counts> {
        self.service.counts(&self.owner, search.as_deref()).await
    }

    async fn toggle(&self, key: EntryKey, snapshot: Snapshot) -> AppResult<bool> {
        self.service.toggle(&self.owner, key, snapshot).await
    }
}

enum Command {
    Search(String),
    Category(Option<Category>),
    Scrolled(f32),
    Retry,
    Toggle {
        key: EntryKey,
        snapshot: Snapshot,
        reply: oneshot::Sender<AppResult<bool>>,
    },
}

/// Outcomes of backend calls, handed back to the coordinator task
enum Feedback {
    Event(Event),
    Toggled {
        key: EntryKey,
        result: AppResult<bool>,
        reply: oneshot::Sender<AppResult<bool>>,
    },
}

/// Presentation-side handle; the coordinator task stops when it is dropped
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<View>,
}

impl CoordinatorHandle {
    pub fn set_search(&self, text: impl Into<String>) {
        self.send(Command::Search(text.into()));
    }

    pub fn select_category(&self, category: Option<Category>) {
        self.send(Command::Category(category));
    }

    pub fn scrolled(&self, fraction: f32) {
        self.send(Command::Scrolled(fraction));
    }

    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Toggles an entry and waits for the store's answer
    ///
    /// Resolves once the coordinator has applied the outcome: the published
    /// view already reflects it, while the counts refresh may still be running.
    pub async fn toggle(&self, key: EntryKey, snapshot: Snapshot) -> AppResult<bool> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Toggle {
            key,
            snapshot,
            reply,
        });
        response
            .await
            .map_err(|_| AppError::Internal("Coordinator stopped".to_string()))?
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    pub fn current(&self) -> View {
        self.view.borrow().clone()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Coordinator task is gone, dropping command");
        }
    }
}

/// Starts the coordinator task and issues the first query
pub fn spawn<B: WatchlistBackend>(backend: Arc<B>, config: CoordinatorConfig) -> CoordinatorHandle {
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (view_tx, view) = watch::channel(View::default());

    tokio::spawn(run(backend, Coordinator::new(config), command_rx, view_tx));

    CoordinatorHandle { commands, view }
}

async fn run<B: WatchlistBackend>(
    backend: Arc<B>,
    mut coordinator: Coordinator,
    mut commands: mpsc::UnboundedReceiver<Command>,
    view: watch::Sender<View>,
) {
    let (feedback, mut feedback_rx) = mpsc::unbounded_channel();
    let mut deadline: Option<Instant> = None;
    let mut toggle_reply: Option<(oneshot::Sender<AppResult<bool>>, AppResult<bool>)> = None;

    tracing::debug!("Coordinator started");
    let mut next = Some(Event::Started);

    loop {
        if let Some(event) = next.take() {
            for effect in coordinator.update(event) {
                perform(&backend, &feedback, effect, &mut deadline);
            }
            view.send_replace(coordinator.view());
        }
        if let Some((reply, result)) = toggle_reply.take() {
            let _ = reply.send(result);
        }

        next = tokio::select! {
            command = commands.recv() => match command {
                None => break,
                Some(Command::Toggle { key, snapshot, reply }) => {
                    let backend = Arc::clone(&backend);
                    let feedback = feedback.clone();
                    tokio::spawn(async move {
                        let result = backend.toggle(key, snapshot).await;
                        let _ = feedback.send(Feedback::Toggled { key, result, reply });
                    });
                    None
                }
                Some(Command::Search(text)) => Some(Event::SearchInput {
                    text,
                    at: Instant::now().into_std(),
                }),
                Some(Command::Category(category)) => Some(Event::CategorySelected(category)),
                Some(Command::Scrolled(fraction)) => Some(Event::Scrolled { fraction }),
                Some(Command::Retry) => Some(Event::RetryRequested),
            },
            Some(outcome) = feedback_rx.recv() => match outcome {
                Feedback::Event(event) => Some(event),
                Feedback::Toggled { key, result, reply } => {
                    let applied = result
                        .as_ref()
                        .ok()
                        .map(|&present| Event::EntryToggled { key, present });
                    toggle_reply = Some((reply, result));
                    applied
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                Some(Event::DebounceElapsed { now: Instant::now().into_std() })
            }
        };
    }

    tracing::debug!("Coordinator stopped");
}

fn perform<B: WatchlistBackend>(
    backend: &Arc<B>,
    feedback: &mpsc::UnboundedSender<Feedback>,
    effect: Effect,
    deadline: &mut Option<Instant>,
) {
    match effect {
        Effect::ScheduleDebounce { deadline: at } => *deadline = Some(Instant::from_std(at)),
        Effect::FetchPage(fetch) => {
            let backend = Arc::clone(backend);
            let feedback = feedback.clone();
            tokio::spawn(async move {
                let ticket = fetch.ticket;
                let event = match backend.query(fetch.request).await {
                    Ok(page) => Event::PageLoaded { ticket, page },
                    Err(e) => Event::PageFailed {
                        ticket,
                        error: e.to_string(),
                    },
                };
                let _ = feedback.send(Feedback::Event(event));
            });
        }
        Effect::FetchCounts { ticket, search } => {
            let backend = Arc::clone(backend);
            let feedback = feedback.clone();
            tokio::spawn(async move {
                let event = match backend.counts(search).await {
                    Ok(counts) => Event::CountsLoaded { ticket, counts },
                    Err(e) => Event::CountsFailed {
                        ticket,
                        error: e.to_string(),
                    },
                };
                let _ = feedback.send(Feedback::Event(event));
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Display;
    use crate::models::{BucketCounts, Entry};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    fn entry(id: i64, title: &str) -> Entry {
        Entry {
            owner: OwnerId::parse("alice").unwrap(),
            category: Category::Movie,
            external_id: id,
            snapshot: Snapshot::titled(title),
            added_at: Utc::now(),
            seq: id,
        }
    }

    fn movies(all: u64) -> Counts {
        let buckets = BucketCounts {
            all,
            movie: all,
            tv: 0,
        };
        Counts {
            filtered: buckets,
            total: buckets,
        }
    }

    fn shown_ids(view: &View) -> Option<Vec<i64>> {
        match &view.display {
            Display::Entries {
                entries,
                stale: false,
            } => Some(entries.iter().map(|e| e.external_id).collect()),
            _ => None,
        }
    }

    async fn wait_until(handle: &CoordinatorHandle, predicate: impl Fn(&View) -> bool) -> View {
        let mut views = handle.subscribe();
        let view = timeout(Duration::from_secs(5), views.wait_for(|view| predicate(view)))
            .await
            .expect("timed out waiting for view")
            .expect("coordinator stopped");
        view.clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_input_issues_one_search() {
        let queries = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&queries);

        let mut backend = MockWatchlistBackend::new();
        backend.expect_query().returning(move |request| {
            seen.fetch_add(1, Ordering::SeqCst);
            let page = match request.search.as_deref() {
                Some("bat") => vec![entry(3, "Batman Begins")],
                _ => vec![entry(1, "Heat"), entry(3, "Batman Begins")],
            };
            Ok(Page::done(page))
        });
        backend.expect_counts().returning(|_| Ok(movies(2)));

        let handle = spawn(Arc::new(backend), CoordinatorConfig::default());
        wait_until(&handle, |view| shown_ids(view) == Some(vec![1, 3])).await;

        handle.set_search("b");
        handle.set_search("ba");
        handle.set_search("bat");

        let view = wait_until(&handle, |view| shown_ids(view) == Some(vec![3])).await;
        assert_eq!(view.search_input, "bat");
        assert_eq!(queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_removal_refreshes_counts() {
        let counted = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counted);

        let mut backend = MockWatchlistBackend::new();
        backend
            .expect_query()
            .times(1)
            .returning(|_| Ok(Page::done(vec![entry(1, "Heat")])));
        backend.expect_counts().returning(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(movies(if n == 0 { 1 } else { 0 }))
        });
        backend.expect_toggle().returning(|_, _| Ok(false));

        let handle = spawn(Arc::new(backend), CoordinatorConfig::default());
        wait_until(&handle, |view| shown_ids(view) == Some(vec![1])).await;

        let present = handle
            .toggle(EntryKey::new(Category::Movie, 1), Snapshot::titled("Heat"))
            .await
            .unwrap();
        assert!(!present);
        assert_eq!(handle.current().display, Display::Empty);

        let view = wait_until(&handle, |view| {
            view.counts.map(|c| c.total.all) == Some(0)
        })
        .await;
        assert_eq!(view.display, Display::Empty);
        assert_eq!(counted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_first_page_can_be_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&attempts);

        let mut backend = MockWatchlistBackend::new();
        backend.expect_query().returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::Internal("upstream unavailable".to_string()))
            } else {
                Ok(Page::done(vec![entry(7, "Alien")]))
            }
        });
        backend.expect_counts().returning(|_| Ok(movies(1)));

        let handle = spawn(Arc::new(backend), CoordinatorConfig::default());
        let failed = wait_until(&handle, |view| view.can_retry).await;
        assert_eq!(failed.display, Display::Skeleton);
        assert!(failed
            .error
            .as_deref()
            .is_some_and(|e| e.contains("upstream unavailable")));

        handle.retry();
        let view = wait_until(&handle, |view| shown_ids(view) == Some(vec![7])).await;
        assert_eq!(view.error, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_owner_backend_round_trip() {
        let service = WatchlistService::in_memory();
        let backend = Arc::new(OwnerBackend::new(
            service,
            OwnerId::parse("alice").unwrap(),
        ));
        let handle = spawn(Arc::clone(&backend), CoordinatorConfig::default());
        wait_until(&handle, |view| view.display == Display::Empty).await;

        let present = handle
            .toggle(EntryKey::new(Category::Tv, 1396), Snapshot::titled("Breaking Bad"))
            .await
            .unwrap();
        assert!(present);

        wait_until(&handle, |view| shown_ids(view) == Some(vec![1396])).await;
    }
}
