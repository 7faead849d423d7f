//! Event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::database::store::{EventChange, EventStore};
use crate::models::{Event, EventStatus, NewEvent, Roster};
use crate::utils::errors::{CharismError, Result};

const EVENT_COLUMNS: &str = "id, title, description, starts_at, ends_at, capacity, status, self_registration, \
     registration_opens_at, registration_closes_at, created_by, attendance, version, created_at, updated_at";

#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    capacity: Option<i32>,
    status: String,
    self_registration: bool,
    registration_opens_at: Option<DateTime<Utc>>,
    registration_closes_at: Option<DateTime<Utc>>,
    created_by: i64,
    attendance: Json<Roster>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = CharismError;

    fn try_from(row: EventRow) -> Result<Self> {
        let capacity = row
            .capacity
            .map(|c| {
                u32::try_from(c).map_err(|_| {
                    CharismError::InvariantViolation(format!("event {} has negative capacity {}", row.id, c))
                })
            })
            .transpose()?;

        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            capacity,
            status: row.status.parse()?,
            self_registration: row.self_registration,
            registration_opens_at: row.registration_opens_at,
            registration_closes_at: row.registration_closes_at,
            created_by: row.created_by,
            attendance: row.attendance.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn capacity_column(capacity: Option<u32>) -> Result<Option<i32>> {
    capacity
        .map(|c| i32::try_from(c).map_err(|_| CharismError::InvalidInput(format!("Capacity too large: {}", c))))
        .transpose()
}

/// Postgres-backed event store; the roster lives in a JSONB column.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    /// Create a new draft event
    async fn insert(&self, request: NewEvent) -> Result<Event> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (title, description, starts_at, ends_at, capacity, status, self_registration,
                                registration_opens_at, registration_closes_at, created_by, attendance,
                                version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, $12)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(capacity_column(request.capacity)?)
        .bind(EventStatus::Draft.as_str())
        .bind(request.self_registration)
        .bind(request.registration_opens_at)
        .bind(request.registration_closes_at)
        .bind(request.created_by)
        .bind(Json(Roster::new()))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Find event by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    /// List events by start time
    async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY starts_at ASC, id ASC",
            EVENT_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    /// Row-locked read-modify-write; the seat count is re-checked by the database
    async fn update(&self, id: i64, change: &mut EventChange<'_>) -> Result<Option<Event>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut event = Event::try_from(row)?;
        change(&mut event)?;
        event.check_capacity_invariant()?;
        let active = i64::try_from(event.attendance.active_count()).unwrap_or(i64::MAX);

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET status = $2,
                attendance = $3,
                version = version + 1,
                updated_at = $4
            WHERE id = $1
              AND (capacity IS NULL OR $5 <= capacity)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(event.status.as_str())
        .bind(Json(&event.attendance))
        .bind(Utc::now())
        .bind(active)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(CharismError::InvariantViolation(format!(
                "event {} would hold {} entries over its capacity",
                id, active
            )));
        };
        tx.commit().await?;

        Ok(Some(row.try_into()?))
    }
}
