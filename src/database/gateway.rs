//! Bounded, retrying access to the event store
//!
//! Every store round trip runs under the configured timeout. A call that
//! fails with `StoreUnavailable` is retried once after a backoff. Before a
//! write is retried the event is reloaded, and if the first attempt turns out
//! to have landed its result is returned instead of applying it twice.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::config::StoreConfig;
use crate::database::store::EventStore;
use crate::models::{Event, EventStatus, NewEvent};
use crate::utils::errors::{CharismError, Result};
use crate::utils::logging::log_store_retry;

#[derive(Clone)]
pub struct StoreGateway {
    store: Arc<dyn EventStore>,
    policy: StoreConfig,
}

impl StoreGateway {
    pub fn new(store: Arc<dyn EventStore>, policy: StoreConfig) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Load an event or fail with `EventNotFound`
    pub async fn load(&self, event_id: i64) -> Result<Event> {
        self.read("find_event", || self.store.find_by_id(event_id))
            .await?
            .ok_or(CharismError::EventNotFound { event_id })
    }

    pub async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>> {
        self.read("list_events", || self.store.list(status)).await
    }

    /// Insert a draft event.
    ///
    /// A timed-out insert may still have landed, so before retrying the
    /// drafts are searched for one matching the request.
    pub async fn insert(&self, event: NewEvent) -> Result<Event> {
        let reason = match self.bounded("insert_event", self.store.insert(event.clone())).await {
            Err(CharismError::StoreUnavailable(reason)) => reason,
            other => return other,
        };
        self.back_off("insert_event", &reason).await;

        let drafts = self.list(Some(EventStatus::Draft)).await?;
        if let Some(existing) = drafts.into_iter().find(|e| {
            e.title == event.title && e.starts_at == event.starts_at && e.created_by == event.created_by
        }) {
            debug!(event_id = existing.id, "Insert had landed before the timeout");
            return Ok(existing);
        }

        self.bounded("insert_event", self.store.insert(event)).await
    }

    /// Apply `change` to the event inside one store update.
    ///
    /// `change` must be a pure function of the snapshot it is given: after a
    /// failed round trip it may run again against a reloaded event. `landed`
    /// tells whether a reloaded event already reflects the output of an
    /// earlier run, in which case that output is returned as is.
    pub async fn mutate<T, F, L>(
        &self,
        event_id: i64,
        operation: &'static str,
        mut change: F,
        landed: L,
    ) -> Result<(Event, T)>
    where
        T: Send,
        F: FnMut(&mut Event) -> Result<T> + Send,
        L: Fn(&Event, &T) -> bool + Send,
    {
        let mut output = None;
        let reason = match self.apply(event_id, operation, &mut change, &mut output).await {
            Err(CharismError::StoreUnavailable(reason)) => reason,
            other => return other,
        };
        self.back_off(operation, &reason).await;

        if let Some(previous) = output.take() {
            let current = self.load(event_id).await?;
            if landed(&current, &previous) {
                debug!(event_id = event_id, operation = operation, "Write had landed before the failure");
                return Ok((current, previous));
            }
        }

        self.apply(event_id, operation, &mut change, &mut output).await
    }

    async fn apply<T, F>(
        &self,
        event_id: i64,
        operation: &'static str,
        change: &mut F,
        output: &mut Option<T>,
    ) -> Result<(Event, T)>
    where
        T: Send,
        F: FnMut(&mut Event) -> Result<T> + Send,
    {
        let mut step = |event: &mut Event| -> Result<()> {
            *output = Some(change(event)?);
            Ok(())
        };
        let stored = self
            .bounded(operation, self.store.update(event_id, &mut step))
            .await?
            .ok_or(CharismError::EventNotFound { event_id })?;

        let value = output.take().ok_or_else(|| {
            CharismError::InvariantViolation(format!("{} on event {} stored without running", operation, event_id))
        })?;
        Ok((stored, value))
    }

    /// Reads are safe to repeat, so they get the single retry directly
    async fn read<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.bounded(operation, f()).await {
            Err(CharismError::StoreUnavailable(reason)) => {
                self.back_off(operation, &reason).await;
                self.bounded(operation, f()).await
            }
            other => other,
        }
    }

    async fn bounded<T>(&self, operation: &'static str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.policy.timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(CharismError::StoreUnavailable(format!(
                "{} timed out after {}ms",
                operation, self.policy.timeout_ms
            ))),
        }
    }

    async fn back_off(&self, operation: &'static str, reason: &str) {
        let backoff = self.policy.retry_backoff();
        log_store_retry(operation, 1, backoff, reason);
        tokio::time::sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::database::store::EventChange;
    use crate::database::MemoryEventStore;
    use crate::models::AttendanceEntry;
    use async_trait::async_trait;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Where a stalled update hangs relative to its write
    #[derive(Clone, Copy)]
    enum Stall {
        BeforeWrite,
        AfterWrite,
    }

    /// Store whose first `stalls` reads or updates hang
    struct StallingStore {
        inner: MemoryEventStore,
        stall: Stall,
        read_stalls: AtomicU32,
        update_stalls: AtomicU32,
        reads: AtomicU32,
        updates: AtomicU32,
    }

    impl StallingStore {
        fn take(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl EventStore for StallingStore {
        async fn insert(&self, event: NewEvent) -> Result<Event> {
            self.inner.insert(event).await
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if Self::take(&self.read_stalls) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.inner.find_by_id(id).await
        }

        async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>> {
            self.inner.list(status).await
        }

        async fn update(&self, id: i64, change: &mut EventChange<'_>) -> Result<Option<Event>> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let stalled = Self::take(&self.update_stalls);
            if stalled && matches!(self.stall, Stall::BeforeWrite) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            let result = self.inner.update(id, change).await;
            if stalled && matches!(self.stall, Stall::AfterWrite) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            result
        }
    }

    fn policy() -> StoreConfig {
        let mut policy = Settings::default().store;
        policy.timeout_ms = 20;
        policy.retry_backoff_ms = 1;
        policy
    }

    fn stalling(stall: Stall, read_stalls: u32, update_stalls: u32) -> Arc<StallingStore> {
        Arc::new(StallingStore {
            inner: MemoryEventStore::new(),
            stall,
            read_stalls: AtomicU32::new(read_stalls),
            update_stalls: AtomicU32::new(update_stalls),
            reads: AtomicU32::new(0),
            updates: AtomicU32::new(0),
        })
    }

    async fn seeded(store: &StallingStore) -> i64 {
        let now = Utc::now();
        store
            .insert(NewEvent {
                title: "Feeding program".to_string(),
                description: None,
                starts_at: now,
                ends_at: now,
                capacity: None,
                self_registration: true,
                registration_opens_at: None,
                registration_closes_at: None,
                created_by: 1,
            })
            .await
            .unwrap()
            .id
    }

    fn add_entry(event: &mut Event, participant_id: i64) -> Result<AttendanceEntry> {
        let entry = AttendanceEntry::pending(participant_id, Utc::now());
        event.attendance.push(entry.clone())?;
        Ok(entry)
    }

    fn entry_present(event: &Event, entry: &AttendanceEntry) -> bool {
        event.attendance.get(entry.participant_id) == Some(entry)
    }

    #[tokio::test]
    async fn test_single_timeout_is_retried() {
        let store = stalling(Stall::BeforeWrite, 1, 0);
        let gateway = StoreGateway::new(store.clone(), policy());

        let result = gateway.load(42).await;
        assert_matches!(result, Err(CharismError::EventNotFound { event_id: 42 }));
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_timeout_surfaces_store_unavailable() {
        let store = stalling(Stall::BeforeWrite, 2, 0);
        let gateway = StoreGateway::new(store.clone(), policy());

        let result = gateway.load(42).await;
        assert_matches!(result, Err(CharismError::StoreUnavailable(_)));
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timed_out_update_is_applied_on_retry() {
        let store = stalling(Stall::BeforeWrite, 0, 1);
        let event_id = seeded(&store).await;
        let gateway = StoreGateway::new(store.clone(), policy());

        let (event, entry) = gateway
            .mutate(event_id, "join", |event| add_entry(event, 7), entry_present)
            .await
            .unwrap();

        assert_eq!(event.version, 1);
        assert_eq!(event.attendance.get(7), Some(&entry));
        assert_eq!(store.updates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_landed_update_is_not_applied_twice() {
        let store = stalling(Stall::AfterWrite, 0, 1);
        let event_id = seeded(&store).await;
        let gateway = StoreGateway::new(store.clone(), policy());

        let mut runs = 0;
        let (event, entry) = gateway
            .mutate(
                event_id,
                "join",
                |event| {
                    runs += 1;
                    add_entry(event, 7)
                },
                entry_present,
            )
            .await
            .unwrap();

        assert_eq!(runs, 1);
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
        assert_eq!(event.version, 1);
        assert_eq!(event.attendance.get(7), Some(&entry));
    }

    #[tokio::test]
    async fn test_update_timing_out_twice_surfaces_store_unavailable() {
        let store = stalling(Stall::BeforeWrite, 0, 2);
        let event_id = seeded(&store).await;
        let gateway = StoreGateway::new(store.clone(), policy());

        let result = gateway.mutate(event_id, "join", |event| add_entry(event, 7), entry_present).await;

        assert_matches!(result, Err(CharismError::StoreUnavailable(_)));
        assert_eq!(store.updates.load(Ordering::SeqCst), 2);
        assert!(store.inner.find_by_id(event_id).await.unwrap().unwrap().attendance.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_change_is_not_retried() {
        let store = stalling(Stall::BeforeWrite, 0, 0);
        let event_id = seeded(&store).await;
        let gateway = StoreGateway::new(store.clone(), policy());

        let mut runs = 0;
        let result: Result<(Event, ())> = gateway
            .mutate(
                event_id,
                "test",
                |_| {
                    runs += 1;
                    Err(CharismError::InvalidInput("nope".to_string()))
                },
                |_, _| false,
            )
            .await;

        assert_matches!(result, Err(CharismError::InvalidInput(_)));
        assert_eq!(runs, 1);
    }

    #[tokio::test]
    async fn test_mutate_unknown_event() {
        let store = stalling(Stall::BeforeWrite, 0, 0);
        let gateway = StoreGateway::new(store, policy());

        let result = gateway.mutate(99, "join", |event| add_entry(event, 7), entry_present).await;
        assert_matches!(result, Err(CharismError::EventNotFound { event_id: 99 }));
    }
}
