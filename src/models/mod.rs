//! Data models module
//!
//! This module contains the event record and its embedded attendance roster

pub mod attendance;
pub mod event;

// Re-export commonly used models
pub use attendance::{ApprovalState, AttendanceEntry, AttendanceState, Roster};
pub use event::{Event, EventStatus, NewEvent};
