//! Accumulates pages of a paginated collection into one list.
//!
//! `InfiniteList` fetches page 0, 1, 2, ... each time `fetch_next` is
//! called, until a page reports `last`. It holds no timer; whatever detects
//! that the user scrolled near the end calls `fetch_next`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::models::Page;

/// Outcome of `InfiniteList::fetch_next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchNext {
    /// A page was fetched and this many items were appended.
    Appended(usize),
    /// Another fetch is still outstanding.
    Busy,
    /// The last page has already been fetched.
    Exhausted,
}

#[derive(Debug)]
struct ListState<T> {
    items: Vec<T>,
    pages_fetched: u32,
    last_page_seen: bool,
    total_elements: Option<u64>,
    total_pages: Option<u32>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages_fetched: 0,
            last_page_seen: false,
            total_elements: None,
            total_pages: None,
        }
    }
}

/// Clears the busy flag even if the fetching future is dropped mid-way.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A lazily fetched, append-only sequence backed by a page fetcher.
///
/// `F` is called with the zero-based page index to fetch.
pub struct InfiniteList<T, F> {
    fetch_page: F,
    state: Mutex<ListState<T>>,
    busy: AtomicBool,
}

impl<T, F, Fut, E> InfiniteList<T, F>
where
    T: Clone,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    pub fn new(fetch_page: F) -> Self {
        Self {
            fetch_page,
            state: Mutex::new(ListState::default()),
            busy: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the next page, unless one is already being fetched or the
    /// collection is exhausted. A failed fetch leaves the list unchanged so
    /// the same page is requested again on the next call.
    pub async fn fetch_next(&self) -> Result<FetchNext, E> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Ok(FetchNext::Busy);
        }
        let _busy = BusyGuard(&self.busy);

        let page_index = {
            let state = self.state();
            if state.last_page_seen {
                return Ok(FetchNext::Exhausted);
            }
            state.pages_fetched
        };

        debug!(page = page_index, "Fetching next page");
        let page = (self.fetch_page)(page_index).await?;

        let mut state = self.state();
        let appended = page.content.len();
        state.items.extend(page.content);
        state.pages_fetched += 1;
        state.last_page_seen = page.last;
        state.total_elements = Some(page.total_elements);
        state.total_pages = Some(page.total_pages);
        Ok(FetchNext::Appended(appended))
    }

    /// Fetch pages until the collection is exhausted or `max_pages` more
    /// pages have been fetched.
    pub async fn fetch_up_to(&self, max_pages: u32) -> Result<usize, E> {
        let mut appended = 0;
        for _ in 0..max_pages {
            match self.fetch_next().await? {
                FetchNext::Appended(n) => appended += n,
                FetchNext::Busy | FetchNext::Exhausted => break,
            }
        }
        Ok(appended)
    }

    /// Forget everything fetched so far and start again from page 0.
    /// Refused (returns `false`) while a fetch is outstanding.
    pub fn reset(&self) -> bool {
        if self.busy.load(Ordering::Acquire) {
            return false;
        }
        *self.state() = ListState::default();
        true
    }

    pub fn items(&self) -> Vec<T> {
        self.state().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pages_fetched(&self) -> u32 {
        self.state().pages_fetched
    }

    /// `true` until a page reporting `last` has been fetched.
    pub fn has_next_page(&self) -> bool {
        !self.state().last_page_seen
    }

    pub fn is_fetching(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Total reported by the most recent page, if any page was fetched.
    pub fn total_elements(&self) -> Option<u64> {
        self.state().total_elements
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.state().total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn page_of(index: u32, pages: u32, per_page: u32) -> Page<u32> {
        Page {
            content: (0..per_page).map(|i| index * per_page + i).collect(),
            first: index == 0,
            last: index + 1 == pages,
            total_pages: pages,
            total_elements: u64::from(pages * per_page),
            empty: false,
        }
    }

    fn recording_list(
        pages: u32,
    ) -> (
        Arc<Mutex<Vec<u32>>>,
        InfiniteList<u32, impl Fn(u32) -> futures::future::Ready<Result<Page<u32>, String>>>,
    ) {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requested);
        let list = InfiniteList::new(move |index| {
            log.lock().unwrap().push(index);
            futures::future::ready(Ok(page_of(index, pages, 2)))
        });
        (requested, list)
    }

    #[tokio::test]
    async fn test_pages_requested_in_order_then_exhausted() {
        let (requested, list) = recording_list(3);

        for _ in 0..3 {
            assert_eq!(list.fetch_next().await, Ok(FetchNext::Appended(2)));
        }
        assert_eq!(list.fetch_next().await, Ok(FetchNext::Exhausted));

        assert_eq!(*requested.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(list.items(), vec![0, 1, 2, 3, 4, 5]);
        assert!(!list.has_next_page());
        assert_eq!(list.total_elements(), Some(6));
    }

    #[tokio::test]
    async fn test_failed_page_is_retried() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&attempts);
        let list = InfiniteList::new(move |index| {
            let mut log = log.lock().unwrap();
            log.push(index);
            let result = if log.len() == 2 {
                Err("timeout".to_string())
            } else {
                Ok(page_of(index, 2, 1))
            };
            futures::future::ready(result)
        });

        assert_eq!(list.fetch_next().await, Ok(FetchNext::Appended(1)));
        assert_eq!(list.fetch_next().await, Err("timeout".to_string()));
        assert!(!list.is_fetching());
        assert_eq!(list.fetch_next().await, Ok(FetchNext::Appended(1)));
        assert_eq!(*attempts.lock().unwrap(), vec![0, 1, 1]);
        assert_eq!(list.items(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_fetch_while_busy_is_noop() {
        let (release, gate) = oneshot::channel::<()>();
        let gate = Mutex::new(Some(gate));
        let list = InfiniteList::new(move |index| {
            let gate = gate.lock().unwrap().take();
            async move {
                if let Some(gate) = gate {
                    gate.await.ok();
                }
                Ok::<_, String>(page_of(index, 5, 1))
            }
        });

        let first = list.fetch_next();
        let second = async {
            tokio::task::yield_now().await;
            let outcome = list.fetch_next().await;
            release.send(()).ok();
            outcome
        };
        let (a, b) = tokio::join!(first, second);

        assert_eq!(a, Ok(FetchNext::Appended(1)));
        assert_eq!(b, Ok(FetchNext::Busy));
        assert_eq!(list.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_reset_restarts_from_first_page() {
        let (requested, list) = recording_list(2);
        list.fetch_up_to(5).await.expect("fetch all");
        assert_eq!(list.len(), 4);

        assert!(list.reset());
        assert!(list.is_empty());
        assert!(list.has_next_page());
        list.fetch_next().await.expect("refetch");
        assert_eq!(*requested.lock().unwrap(), vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let list = InfiniteList::new(|_| {
            futures::future::ready(Ok::<_, String>(Page::<u32> {
                content: vec![],
                first: true,
                last: true,
                total_pages: 0,
                total_elements: 0,
                empty: true,
            }))
        });
        assert_eq!(list.fetch_next().await, Ok(FetchNext::Appended(0)));
        assert_eq!(list.fetch_next().await, Ok(FetchNext::Exhausted));
        assert!(list.is_empty());
    }
}
