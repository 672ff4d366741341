//! Interval-driven fetch-and-merge of upstream feeds
//!
//! Each view owns one poller. On every tick all of the view's feeds are
//! fetched concurrently, then applied to the view model as one batch.
//! A failed feed keeps its last-known-good data and only sets the
//! view's aggregate error.

mod runner;

pub use runner::{FeedPoller, FeedPollerBuilder, PollHandle, ViewRefresher};

use crate::api::{ApiError, ApiResult, ConsoleApi};
use async_trait::async_trait;

/// A view's fetch set: how to fetch one tick and how to merge it
#[async_trait]
pub trait FeedSet: Send + Sync + 'static {
    /// View model the batches are merged into
    type Model: Default + Send + Sync + 'static;
    /// Results of every feed for one tick
    type Batch: Send + 'static;

    /// Name used in logs and metrics
    fn view(&self) -> &'static str;

    /// Fetch every feed concurrently
    async fn fetch(&self, api: &dyn ConsoleApi) -> Self::Batch;

    /// Merge one batch into the model, reporting which feeds failed
    fn apply(model: &mut Self::Model, batch: Self::Batch) -> TickReport;
}

/// Last-known-good value of one feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSlot<T> {
    items: Vec<T>,
    loaded: bool,
}

impl<T> Default for FeedSlot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loaded: false,
        }
    }
}

impl<T> FeedSlot<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Whether any fetch of this feed has succeeded yet
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.loaded = true;
    }
}

/// One failed feed within a tick
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFailure {
    pub feed: &'static str,
    pub error: ApiError,
}

/// Outcome of applying one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    failures: Vec<FeedFailure>,
}

impl TickReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot on success, keep it and record the failure otherwise
    pub fn merge<T>(&mut self, feed: &'static str, slot: &mut FeedSlot<T>, outcome: ApiResult<Vec<T>>) {
        match outcome {
            Ok(items) => slot.replace(items),
            Err(error) => self.failures.push(FeedFailure { feed, error }),
        }
    }

    pub fn failures(&self) -> &[FeedFailure] {
        &self.failures
    }

    /// Error text for the view banner: the last inline-visible failure.
    /// Expired sessions are handled by the auth context, never inline.
    pub fn banner(&self) -> Option<String> {
        self.failures
            .iter()
            .rev()
            .find(|f| !f.error.is_auth_expired())
            .map(|f| f.error.to_string())
    }
}

/// View model plus the aggregate error and the count of applied ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState<M> {
    pub model: M,
    pub error: Option<String>,
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Operation;

    fn server_error(msg: &str) -> ApiError {
        ApiError::server(Operation::Alerts, Some(500), Some(msg.to_string()))
    }

    #[test]
    fn test_failed_merge_keeps_previous_items() {
        let mut slot = FeedSlot::default();
        let mut report = TickReport::new();
        report.merge("alerts", &mut slot, Ok(vec![1, 2, 3]));
        report.merge("alerts", &mut slot, Err(server_error("boom")));

        assert_eq!(slot.items(), &[1, 2, 3]);
        assert!(slot.is_loaded());
        assert_eq!(report.failures().len(), 1);
    }

    #[test]
    fn test_banner_is_last_failure() {
        let mut a: FeedSlot<u8> = FeedSlot::default();
        let mut b: FeedSlot<u8> = FeedSlot::default();
        let mut report = TickReport::new();
        report.merge("containers", &mut a, Err(server_error("first")));
        report.merge("metrics", &mut b, Err(server_error("second")));

        assert_eq!(report.banner(), Some("second".to_string()));
    }

    #[test]
    fn test_banner_skips_expired_session() {
        let mut a: FeedSlot<u8> = FeedSlot::default();
        let mut report = TickReport::new();
        report.merge("alerts", &mut a, Err(ApiError::AuthExpired));
        assert_eq!(report.banner(), None);
        assert!(!a.is_loaded());
    }
}
