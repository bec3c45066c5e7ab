//! Store contract.
//!
//! Reads are per-record consistent and need no coordination. Writes are
//! batched into a [`UnitOfWork`] and committed atomically: either every write
//! in the unit is visible afterwards or none is.
//!
//! Backends also enforce the membership and capacity invariants on commit
//! (one membership per user, `0 <= participant_count <= max_participants`,
//! memberships reference existing rooms). The membership service serializes
//! transitions itself; these checks are the last line that keeps a bad unit
//! from ever committing.

use crate::errors::RoomError;
use crate::models::{Membership, Room, Subject};
use async_trait::async_trait;
use uuid::Uuid;

/// A single write inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// Persist a new room.
    InsertRoom(Room),
    /// Persist a new membership. Fails with a conflict if the user already
    /// has one.
    InsertMembership(Membership),
    /// Overwrite a room's cached participant count.
    SetParticipantCount { room_id: Uuid, count: i32 },
    /// Delete a membership by id.
    DeleteMembership { membership_id: Uuid },
}

impl StoreWrite {
    /// Bounded label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreWrite::InsertRoom(_) => "insert_room",
            StoreWrite::InsertMembership(_) => "insert_membership",
            StoreWrite::SetParticipantCount { .. } => "set_participant_count",
            StoreWrite::DeleteMembership { .. } => "delete_membership",
        }
    }
}

/// Ordered writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    writes: Vec<StoreWrite>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_room(mut self, room: Room) -> Self {
        self.writes.push(StoreWrite::InsertRoom(room));
        self
    }

    pub fn insert_membership(mut self, membership: Membership) -> Self {
        self.writes.push(StoreWrite::InsertMembership(membership));
        self
    }

    pub fn set_participant_count(mut self, room_id: Uuid, count: i32) -> Self {
        self.writes
            .push(StoreWrite::SetParticipantCount { room_id, count });
        self
    }

    pub fn delete_membership(mut self, membership_id: Uuid) -> Self {
        self.writes
            .push(StoreWrite::DeleteMembership { membership_id });
        self
    }

    pub fn writes(&self) -> &[StoreWrite] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn into_writes(self) -> Vec<StoreWrite> {
        self.writes
    }
}

/// Durable keyed persistence for rooms and memberships.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Get a room by id.
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, RoomError>;

    /// List rooms ordered by creation time, optionally filtered by exact
    /// subject.
    async fn list_rooms(&self, subject: Option<&str>) -> Result<Vec<Room>, RoomError>;

    /// Get the user's live membership, if any.
    async fn get_membership_by_user(&self, user_id: &str)
        -> Result<Option<Membership>, RoomError>;

    /// List a room's memberships ordered by join time.
    async fn list_memberships(&self, room_id: Uuid) -> Result<Vec<Membership>, RoomError>;

    /// Apply a unit of work atomically.
    async fn commit(&self, unit: UnitOfWork) -> Result<(), RoomError>;

    /// Connectivity probe for health checks.
    async fn ping(&self) -> bool;
}

/// Persistence for the subject catalog.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// List subjects ordered by name.
    async fn list_subjects(&self) -> Result<Vec<Subject>, RoomError>;

    /// Insert `subjects` only if the catalog is empty.
    ///
    /// Returns the number of subjects inserted.
    async fn seed_subjects_if_empty(&self, subjects: Vec<Subject>) -> Result<u64, RoomError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_of_work_preserves_order() {
        let room_id = Uuid::new_v4();
        let membership_id = Uuid::new_v4();

        let unit = UnitOfWork::new()
            .delete_membership(membership_id)
            .set_participant_count(room_id, 0);

        assert_eq!(
            unit.writes(),
            &[
                StoreWrite::DeleteMembership { membership_id },
                StoreWrite::SetParticipantCount { room_id, count: 0 },
            ]
        );
        assert!(!unit.is_empty());
        assert!(UnitOfWork::new().is_empty());
    }

    #[test]
    fn test_store_write_kind_labels() {
        let write = StoreWrite::SetParticipantCount {
            room_id: Uuid::new_v4(),
            count: 1,
        };
        assert_eq!(write.kind(), "set_participant_count");
        assert_eq!(
            StoreWrite::DeleteMembership {
                membership_id: Uuid::new_v4()
            }
            .kind(),
            "delete_membership"
        );
    }
}
