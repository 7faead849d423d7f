//! Event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attendance::Roster;
use crate::utils::errors::{CharismError, Result};

/// Publication status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Whether `next` is a legal lifecycle step from this status
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Draft, EventStatus::Published)
                | (EventStatus::Published, EventStatus::Completed)
                | (EventStatus::Draft, EventStatus::Cancelled)
                | (EventStatus::Published, EventStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = CharismError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "completed" => Ok(EventStatus::Completed),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(CharismError::InvalidInput(format!("Unknown event status: {}", other))),
        }
    }
}

/// A scheduled activity participants can register for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Maximum number of seat-holding entries; `None` means unbounded
    pub capacity: Option<u32>,
    pub status: EventStatus,
    pub self_registration: bool,
    pub registration_opens_at: Option<DateTime<Utc>>,
    pub registration_closes_at: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub attendance: Roster,
    /// Bumped by the store on every committed write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Seats left, or `None` when the event is unbounded
    pub fn seats_remaining(&self) -> Option<u32> {
        self.capacity.map(|capacity| {
            let taken = u32::try_from(self.attendance.active_count()).unwrap_or(u32::MAX);
            capacity.saturating_sub(taken)
        })
    }

    /// Whether `now` falls inside the registration window (open bounds are unbounded)
    pub fn registration_window_open(&self, now: DateTime<Utc>) -> bool {
        let opened = self.registration_opens_at.map_or(true, |opens| now >= opens);
        let not_closed = self.registration_closes_at.map_or(true, |closes| now < closes);
        opened && not_closed
    }

    /// Checks the roster against capacity
    pub fn check_capacity_invariant(&self) -> Result<()> {
        if let Some(capacity) = self.capacity {
            let active = self.attendance.active_count();
            if active > capacity as usize {
                return Err(CharismError::InvariantViolation(format!(
                    "event {} has {} active entries for capacity {}",
                    self.id, active, capacity
                )));
            }
        }
        Ok(())
    }
}

/// Fields supplied by staff when creating an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<u32>,
    pub self_registration: bool,
    pub registration_opens_at: Option<DateTime<Utc>>,
    pub registration_closes_at: Option<DateTime<Utc>>,
    pub created_by: i64,
}

impl NewEvent {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CharismError::InvalidInput("Event title is required".to_string()));
        }
        if self.ends_at < self.starts_at {
            return Err(CharismError::InvalidInput("Event cannot end before it starts".to_string()));
        }
        if let (Some(opens), Some(closes)) = (self.registration_opens_at, self.registration_closes_at) {
            if closes <= opens {
                return Err(CharismError::InvalidInput(
                    "Registration window must close after it opens".to_string(),
                ));
            }
        }
        if let Some(capacity) = self.capacity {
            if capacity > i32::MAX as u32 {
                return Err(CharismError::InvalidInput(format!("Capacity too large: {}", capacity)));
            }
        }
        Ok(())
    }

    /// Materialize a draft event with the given store-assigned id
    pub fn into_event(self, id: i64, now: DateTime<Utc>) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            capacity: self.capacity,
            status: EventStatus::Draft,
            self_registration: self.self_registration,
            registration_opens_at: self.registration_opens_at,
            registration_closes_at: self.registration_closes_at,
            created_by: self.created_by,
            attendance: Roster::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
