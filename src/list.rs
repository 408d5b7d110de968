//! Paged, filtered view of the user directory.
//!
//! [`UserList`] owns the current [`ListQuery`] and the last page fetched for it.
//! Every mutation goes through its operations; observers read [`ListSnapshot`]s
//! either on demand or through a `watch` subscription.
//!
//! Overlapping refreshes are sequenced: each request takes a ticket when it is
//! issued and only the newest ticket may write its response. Anything older is
//! dropped when it lands.
//!
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::directory::{DirectoryService, ListQuery, PagedResult, UserRecord};
use crate::error::{ConsoleError, DirectoryError};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// What the table should show.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ListStatus {
    Loading,
    Empty,
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListSnapshot {
    pub query: ListQuery,
    pub page: PagedResult<UserRecord>,
    /// The newest request has not resolved yet.
    pub loading: bool,
    /// At least one request has resolved successfully.
    pub loaded: bool,
    /// Error of the newest request, if it failed. The previous page is kept.
    pub error: Option<String>,
}

impl ListSnapshot {
    /// A list that never fetched counts as loading until its first request fails.
    pub fn status(&self) -> ListStatus {
        if self.loading || (!self.loaded && self.error.is_none()) {
            ListStatus::Loading
        } else if self.page.items.is_empty() {
            ListStatus::Empty
        } else {
            ListStatus::Ready
        }
    }

    pub fn page_number(&self) -> usize {
        self.query.page_number()
    }

    pub fn page_count(&self) -> usize {
        self.page.page_count(self.query.page_size)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer request was issued before this one resolved; its response was dropped.
    Superseded,
}

struct ListInner {
    snapshot: ListSnapshot,
    issued: u64,
}

pub struct UserList<S: ?Sized> {
    service: Arc<S>,
    inner: Mutex<ListInner>,
    updates: watch::Sender<ListSnapshot>,
}

impl<S: DirectoryService + ?Sized> UserList<S> {
    pub fn new(service: Arc<S>, page_size: usize) -> Self {
        let snapshot = ListSnapshot {
            query: ListQuery::first_page(page_size),
            page: PagedResult::empty(),
            loading: false,
            loaded: false,
            error: None,
        };
        let (updates, _) = watch::channel(snapshot.clone());
        Self {
            service,
            inner: Mutex::new(ListInner { snapshot, issued: 0 }),
            updates,
        }
    }

    pub fn snapshot(&self) -> ListSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot> {
        self.updates.subscribe()
    }

    pub fn query(&self) -> ListQuery {
        self.lock().snapshot.query.clone()
    }

    /// Filter by `keyword`, starting over at page 1.
    ///
    /// # Arguments
    ///
    /// * `keyword` - Matched case-insensitively against names, email, type and roles; empty lists everyone
    ///
    /// # Returns
    ///
    /// * `RefreshOutcome::Applied` when this filter's page was stored
    /// * `RefreshOutcome::Superseded` when a later request overtook it
    /// * `Err(ConsoleError)` if the directory call failed
    pub async fn set_filter(&self, keyword: impl Into<String>) -> Result<RefreshOutcome, ConsoleError> {
        let keyword = keyword.into();
        self.mutate(|inner| {
            inner.snapshot.query.keyword = keyword;
            inner.snapshot.query.skip_count = 0;
        });
        self.refresh().await
    }

    /// Jump to a 1-based page. Page 0 is read as page 1.
    ///
    /// # Arguments
    ///
    /// * `page_number` - Target page, 1-based
    pub async fn set_page(&self, page_number: usize) -> Result<RefreshOutcome, ConsoleError> {
        self.mutate(|inner| {
            inner.snapshot.query = inner.snapshot.query.for_page(page_number);
        });
        self.refresh().await
    }

    /// Advance one page; returns `None` when already on the last page.
    pub async fn next_page(&self) -> Option<Result<RefreshOutcome, ConsoleError>> {
        let (current, count) = {
            let inner = self.lock();
            (inner.snapshot.page_number(), inner.snapshot.page_count())
        };
        if current >= count {
            return None;
        }
        Some(self.set_page(current + 1).await)
    }

    pub async fn prev_page(&self) -> Option<Result<RefreshOutcome, ConsoleError>> {
        let current = self.lock().snapshot.page_number();
        if current <= 1 {
            return None;
        }
        Some(self.set_page(current - 1).await)
    }

    /// Fetch the page for the current query and store it if no newer request was issued meanwhile.
    ///
    /// # Returns
    ///
    /// * `RefreshOutcome::Applied` or `RefreshOutcome::Superseded`
    /// * `Err(ConsoleError)` on failure; the snapshot keeps the previous page and records the error
    pub async fn refresh(&self) -> Result<RefreshOutcome, ConsoleError> {
        let (ticket, query) = self.issue();
        let result = self.service.get_all(&query).await;
        self.complete(ticket, result)
    }

    fn issue(&self) -> (u64, ListQuery) {
        let mut inner = self.lock();
        inner.issued += 1;
        inner.snapshot.loading = true;
        let ticket = inner.issued;
        let query = inner.snapshot.query.clone();
        self.updates.send_replace(inner.snapshot.clone());
        debug!(ticket, page = query.page_number(), keyword = %query.keyword, "refreshing user list");
        (ticket, query)
    }

    fn complete(
        &self,
        ticket: u64,
        result: Result<PagedResult<UserRecord>, DirectoryError>,
    ) -> Result<RefreshOutcome, ConsoleError> {
        let mut inner = self.lock();
        if ticket != inner.issued {
            debug!(ticket, latest = inner.issued, "dropping superseded user list response");
            return Ok(RefreshOutcome::Superseded);
        }
        inner.snapshot.loading = false;
        let outcome = match result {
            Ok(page) => {
                inner.snapshot.page = page;
                inner.snapshot.loaded = true;
                inner.snapshot.error = None;
                Ok(RefreshOutcome::Applied)
            }
            Err(err) => {
                warn!(ticket, error = %err, "user list refresh failed; keeping previous page");
                inner.snapshot.error = Some(err.to_string());
                Err(err.into())
            }
        };
        self.updates.send_replace(inner.snapshot.clone());
        outcome
    }

    fn mutate(&self, f: impl FnOnce(&mut ListInner)) {
        let mut inner = self.lock();
        f(&mut inner);
        self.updates.send_replace(inner.snapshot.clone());
    }

    fn lock(&self) -> MutexGuard<'_, ListInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectorySeed, InMemoryDirectory};

    fn list() -> UserList<InMemoryDirectory> {
        let dir = InMemoryDirectory::new(DirectorySeed::sample().unwrap());
        UserList::new(Arc::new(dir), DEFAULT_PAGE_SIZE)
    }

    #[tokio::test]
    async fn set_page_moves_skip_window() {
        let list = list();
        for page in 1..=4 {
            list.set_page(page).await.unwrap();
            assert_eq!(list.query().skip_count, (page - 1) * DEFAULT_PAGE_SIZE);
        }
        list.set_page(0).await.unwrap();
        assert_eq!(list.query().skip_count, 0);
    }

    #[tokio::test]
    async fn filter_resets_to_first_page() {
        let list = list();
        list.set_page(2).await.unwrap();
        assert_eq!(list.query().skip_count, 10);
        list.set_filter("pharmac").await.unwrap();
        let snap = list.snapshot();
        assert_eq!(snap.query.skip_count, 0);
        assert_eq!(snap.query.keyword, "pharmac");
        assert!(snap.page.items.iter().all(|u| crate::search::user_matches(u, "pharmac")));
    }

    #[tokio::test]
    async fn starts_unloaded_and_reports_status() {
        let list = list();
        let snap = list.snapshot();
        assert!(!snap.loaded);
        assert_eq!(snap.status(), ListStatus::Loading);
        let failed = ListSnapshot { error: Some("connection refused".into()), ..snap.clone() };
        assert_eq!(failed.status(), ListStatus::Empty);

        list.refresh().await.unwrap();
        let snap = list.snapshot();
        assert!(snap.loaded);
        assert_eq!(snap.status(), ListStatus::Ready);
        assert_eq!(snap.page.items.len(), 10);
        assert_eq!(snap.page_count(), 2);
    }

    #[tokio::test]
    async fn paging_helpers_stop_at_the_edges() {
        let list = list();
        list.refresh().await.unwrap();
        assert!(list.prev_page().await.is_none());
        assert!(list.next_page().await.is_some());
        assert_eq!(list.snapshot().page_number(), 2);
        assert!(list.next_page().await.is_none());
    }

    #[tokio::test]
    async fn subscribers_observe_updates() {
        let list = list();
        let mut rx = list.subscribe();
        list.set_filter("grace").await.unwrap();
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.page.total_count, 1);
        assert!(!seen.loading);
    }
}
