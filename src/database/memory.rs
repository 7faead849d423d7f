//! In-process event store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::store::{EventChange, EventStore};
use crate::models::{Event, EventStatus, NewEvent};
use crate::utils::errors::Result;

#[derive(Default)]
struct Inner {
    events: HashMap<i64, Event>,
    next_id: i64,
}

/// Event store held in memory behind a single lock.
///
/// Every update runs its change under the write lock, so updates of the
/// same store are applied one at a time.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: NewEvent) -> Result<Event> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let event = event.into_event(inner.next_id, Utc::now());
        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
        Ok(self.inner.read().await.events.get(&id).cloned())
    }

    async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>> {
        let inner = self.inner.read().await;
        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn update(&self, id: i64, change: &mut EventChange<'_>) -> Result<Option<Event>> {
        let mut inner = self.inner.write().await;
        let Some(stored) = inner.events.get_mut(&id) else {
            return Ok(None);
        };

        let mut updated = stored.clone();
        change(&mut updated)?;
        updated.check_capacity_invariant()?;

        updated.version += 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(Some(updated))
    }
}
