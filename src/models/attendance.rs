//! Attendance entry and roster models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::errors::{CharismError, Result};

/// Whether the participant showed up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
    Registered,
    Attended,
    Absent,
}

/// Staff decision on a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Disapproved,
}

impl std::fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalState::Pending => write!(f, "pending"),
            ApprovalState::Approved => write!(f, "approved"),
            ApprovalState::Disapproved => write!(f, "disapproved"),
        }
    }
}

impl std::fmt::Display for AttendanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceState::Registered => write!(f, "registered"),
            AttendanceState::Attended => write!(f, "attended"),
            AttendanceState::Absent => write!(f, "absent"),
        }
    }
}

/// One participant's registration within an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub participant_id: i64,
    pub registered_at: DateTime<Utc>,
    pub attendance: AttendanceState,
    pub approval: ApprovalState,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl AttendanceEntry {
    /// Fresh registration awaiting a decision
    pub fn pending(participant_id: i64, registered_at: DateTime<Utc>) -> Self {
        Self {
            participant_id,
            registered_at,
            attendance: AttendanceState::Registered,
            approval: ApprovalState::Pending,
            decided_by: None,
            decided_at: None,
            rejection_reason: None,
        }
    }

    /// Counts against capacity unless disapproved
    pub fn holds_seat(&self) -> bool {
        self.approval != ApprovalState::Disapproved
    }

    pub fn is_pending(&self) -> bool {
        self.approval == ApprovalState::Pending
    }

    /// pending -> approved
    pub fn approve(&mut self, approver_id: i64, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.approval = ApprovalState::Approved;
        self.decided_by = Some(approver_id);
        self.decided_at = Some(now);
        Ok(())
    }

    /// pending -> disapproved
    pub fn disapprove(&mut self, approver_id: i64, reason: Option<String>, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.approval = ApprovalState::Disapproved;
        self.decided_by = Some(approver_id);
        self.decided_at = Some(now);
        self.rejection_reason = reason;
        Ok(())
    }

    /// Record attendance; only approved entries can be marked.
    pub fn mark_attendance(&mut self, attended: bool) -> Result<()> {
        if self.approval != ApprovalState::Approved {
            return Err(CharismError::NotApproved { state: self.approval });
        }
        self.attendance = if attended {
            AttendanceState::Attended
        } else {
            AttendanceState::Absent
        };
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CharismError::NotPending { state: self.approval })
        }
    }
}

/// Ordered attendance collection owned by an event.
///
/// Live entries are unique per participant and looked up through `index`,
/// which is rebuilt on load and kept in step with `entries` on every
/// mutation. Disapproved entries replaced by a later re-join are kept in
/// `archived`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RosterDocument", into = "RosterDocument")]
pub struct Roster {
    entries: Vec<AttendanceEntry>,
    archived: Vec<AttendanceEntry>,
    index: HashMap<i64, usize>,
}

#[derive(Serialize, Deserialize)]
struct RosterDocument {
    #[serde(default)]
    entries: Vec<AttendanceEntry>,
    #[serde(default)]
    archived: Vec<AttendanceEntry>,
}

impl From<RosterDocument> for Roster {
    fn from(doc: RosterDocument) -> Self {
        let mut roster = Roster {
            entries: doc.entries,
            archived: doc.archived,
            index: HashMap::new(),
        };
        roster.reindex();
        roster
    }
}

impl From<Roster> for RosterDocument {
    fn from(roster: Roster) -> Self {
        RosterDocument {
            entries: roster.entries,
            archived: roster.archived,
        }
    }
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant_id: i64) -> Option<&AttendanceEntry> {
        self.index.get(&participant_id).map(|&pos| &self.entries[pos])
    }

    pub fn get_mut(&mut self, participant_id: i64) -> Option<&mut AttendanceEntry> {
        match self.index.get(&participant_id) {
            Some(&pos) => Some(&mut self.entries[pos]),
            None => None,
        }
    }

    pub fn contains(&self, participant_id: i64) -> bool {
        self.index.contains_key(&participant_id)
    }

    /// Append a new live entry
    pub fn push(&mut self, entry: AttendanceEntry) -> Result<()> {
        if self.contains(entry.participant_id) {
            return Err(CharismError::InvariantViolation(format!(
                "participant {} already has a live entry",
                entry.participant_id
            )));
        }
        self.index.insert(entry.participant_id, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Drop a live entry entirely
    pub fn remove(&mut self, participant_id: i64) -> Option<AttendanceEntry> {
        let pos = self.index.remove(&participant_id)?;
        let entry = self.entries.remove(pos);
        self.reindex();
        Some(entry)
    }

    /// Move a disapproved entry out of the live collection into the audit trail
    pub fn archive_disapproved(&mut self, participant_id: i64) -> bool {
        match self.get(participant_id) {
            Some(entry) if entry.approval == ApprovalState::Disapproved => {}
            _ => return false,
        }
        if let Some(entry) = self.remove(participant_id) {
            self.archived.push(entry);
            return true;
        }
        false
    }

    /// Entries currently holding a seat (registered or approved)
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.holds_seat()).count()
    }

    pub fn entries(&self) -> &[AttendanceEntry] {
        &self.entries
    }

    pub fn archived(&self) -> &[AttendanceEntry] {
        &self.archived
    }

    pub fn pending(&self) -> impl Iterator<Item = &AttendanceEntry> {
        self.entries.iter().filter(|e| e.is_pending())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.participant_id, pos))
            .collect();
    }
}
