//! Persistence seam for event records

use async_trait::async_trait;

use crate::models::{Event, EventStatus, NewEvent};
use crate::utils::errors::Result;

/// A change applied to an event while the store holds it exclusively
pub type EventChange<'a> = dyn FnMut(&mut Event) -> Result<()> + Send + 'a;

/// Storage for event records and their embedded rosters.
///
/// `update` is the only write path for an existing event. The store runs
/// `change` against the current record while holding it exclusively, so
/// concurrent updates of one event are serialized. The result is written only
/// when `change` succeeds and the seat-holding entries still fit the event
/// capacity. On success the version is incremented. A capacity breach is
/// reported as `CharismError::InvariantViolation` and nothing is written.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a new draft event and assign its id
    async fn insert(&self, event: NewEvent) -> Result<Event>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>>;

    /// Events ordered by start time, optionally filtered by status
    async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>>;

    /// Apply `change` atomically; `None` when the event does not exist
    async fn update(&self, id: i64, change: &mut EventChange<'_>) -> Result<Option<Event>>;
}
