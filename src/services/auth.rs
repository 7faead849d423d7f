//! Authorization service implementation
//!
//! Callers arrive already authenticated; this module turns a verified actor
//! and role into a capability set and checks it once at the top of each
//! service operation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::errors::{CharismError, Result};

/// Role assigned by the identity layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

/// Fine-grained permission derived from a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Join or leave events for oneself
    SelfRegister,
    /// Approve, disapprove and mark attendance; register others
    ManageRoster,
    /// Create events and move them through their lifecycle
    ManageEvents,
}

impl Role {
    pub fn capabilities(&self) -> HashSet<Capability> {
        match self {
            Role::Student => HashSet::from([Capability::SelfRegister]),
            Role::Staff => HashSet::from([Capability::SelfRegister, Capability::ManageRoster]),
            Role::Admin => HashSet::from([
                Capability::SelfRegister,
                Capability::ManageRoster,
                Capability::ManageEvents,
            ]),
        }
    }
}

/// Verified identity of whoever issued the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    pub capabilities: HashSet<Capability>,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self {
            id,
            role,
            capabilities: role.capabilities(),
        }
    }

    pub fn student(id: i64) -> Self {
        Self::new(id, Role::Student)
    }

    pub fn staff(id: i64) -> Self {
        Self::new(id, Role::Staff)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }

    /// Grant an extra capability on top of the role defaults
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Every operation exposed by the services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Join,
    Leave,
    Approve,
    Disapprove,
    MarkAttendance,
    CreateEvent,
    ChangeEventStatus,
    ViewRoster,
}

impl Operation {
    /// Capability required to act on someone else's behalf (or at all, for staff operations)
    pub fn required_capability(&self) -> Capability {
        match self {
            Operation::Join | Operation::Leave => Capability::ManageRoster,
            Operation::Approve | Operation::Disapprove | Operation::MarkAttendance => Capability::ManageRoster,
            Operation::ViewRoster => Capability::ManageRoster,
            Operation::CreateEvent | Operation::ChangeEventStatus => Capability::ManageEvents,
        }
    }

    /// Capability that suffices when the actor is the subject of the operation
    pub fn self_service_capability(&self) -> Option<Capability> {
        match self {
            Operation::Join | Operation::Leave => Some(Capability::SelfRegister),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Join => "join",
            Operation::Leave => "leave",
            Operation::Approve => "approve",
            Operation::Disapprove => "disapprove",
            Operation::MarkAttendance => "mark_attendance",
            Operation::CreateEvent => "create_event",
            Operation::ChangeEventStatus => "change_event_status",
            Operation::ViewRoster => "view_roster",
        }
    }
}

/// Check that `actor` may perform `operation` on `subject` (a participant id, when there is one)
pub fn authorize(actor: &Actor, operation: Operation, subject: Option<i64>) -> Result<()> {
    if let (Some(capability), Some(subject)) = (operation.self_service_capability(), subject) {
        if subject == actor.id && actor.can(capability) {
            debug!(actor_id = actor.id, operation = operation.as_str(), "Self-service operation authorized");
            return Ok(());
        }
    }

    let required = operation.required_capability();
    if actor.can(required) {
        debug!(actor_id = actor.id, operation = operation.as_str(), "Operation authorized");
        return Ok(());
    }

    warn!(
        actor_id = actor.id,
        role = ?actor.role,
        operation = operation.as_str(),
        subject = subject,
        "Operation denied"
    );
    Err(CharismError::Unauthorized(format!(
        "actor {} lacks {:?} for {}",
        actor.id,
        required,
        operation.as_str()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_role_capabilities() {
        assert!(Actor::student(1).can(Capability::SelfRegister));
        assert!(!Actor::student(1).can(Capability::ManageRoster));
        assert!(Actor::staff(2).can(Capability::ManageRoster));
        assert!(!Actor::staff(2).can(Capability::ManageEvents));
        assert!(Actor::admin(3).can(Capability::ManageEvents));
    }

    #[test]
    fn test_student_can_only_join_for_self() {
        let student = Actor::student(10);
        assert!(authorize(&student, Operation::Join, Some(10)).is_ok());
        assert_matches!(authorize(&student, Operation::Join, Some(11)), Err(CharismError::Unauthorized(_)));
        assert!(authorize(&student, Operation::Leave, Some(10)).is_ok());
    }

    #[test]
    fn test_staff_operations() {
        let staff = Actor::staff(20);
        assert!(authorize(&staff, Operation::Join, Some(10)).is_ok());
        assert!(authorize(&staff, Operation::Approve, Some(10)).is_ok());
        assert_matches!(authorize(&staff, Operation::CreateEvent, None), Err(CharismError::Unauthorized(_)));

        let student = Actor::student(10);
        assert_matches!(authorize(&student, Operation::Approve, Some(10)), Err(CharismError::Unauthorized(_)));
    }

    #[test]
    fn test_extra_capability() {
        let organizer = Actor::staff(30).with_capability(Capability::ManageEvents);
        assert!(authorize(&organizer, Operation::ChangeEventStatus, None).is_ok());
    }
}
