//! In-process store.
//!
//! Keeps every record behind a single `RwLock`. A unit of work is applied
//! under the write guard with an undo log; if any write is rejected the
//! already-applied writes are reverted before the guard is released, so
//! readers never observe a partial unit.

use crate::errors::RoomError;
use crate::models::{Membership, Room, Subject};
use crate::repositories::store::{RoomStore, StoreWrite, SubjectStore, UnitOfWork};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    rooms: HashMap<Uuid, Room>,
    memberships: HashMap<Uuid, Membership>,
    /// user_id -> membership id. Enforces one membership per user.
    membership_by_user: HashMap<String, Uuid>,
    subjects: Vec<Subject>,
}

/// Inverse of an applied write.
enum Undo {
    RemoveRoom(Uuid),
    RemoveMembership(Uuid),
    RestoreCount { room_id: Uuid, count: i32 },
    RestoreMembership(Membership),
}

impl State {
    fn apply(&mut self, write: StoreWrite) -> Result<Undo, RoomError> {
        match write {
            StoreWrite::InsertRoom(room) => {
                if self.rooms.contains_key(&room.id) {
                    return Err(RoomError::Database(format!(
                        "duplicate room id {}",
                        room.id
                    )));
                }
                let room_id = room.id;
                self.rooms.insert(room_id, room);
                Ok(Undo::RemoveRoom(room_id))
            }
            StoreWrite::InsertMembership(membership) => {
                if self.membership_by_user.contains_key(&membership.user_id) {
                    return Err(RoomError::already_in_another_room());
                }
                if !self.rooms.contains_key(&membership.room_id) {
                    return Err(RoomError::room_not_found());
                }
                let membership_id = membership.id;
                self.membership_by_user
                    .insert(membership.user_id.clone(), membership_id);
                self.memberships.insert(membership_id, membership);
                Ok(Undo::RemoveMembership(membership_id))
            }
            StoreWrite::SetParticipantCount { room_id, count } => {
                let room = self
                    .rooms
                    .get_mut(&room_id)
                    .ok_or_else(RoomError::room_not_found)?;
                if count > room.max_participants {
                    return Err(RoomError::room_full());
                }
                if count < 0 {
                    return Err(RoomError::Database(format!(
                        "negative participant count for room {}",
                        room_id
                    )));
                }
                let previous = room.participant_count;
                room.participant_count = count;
                Ok(Undo::RestoreCount {
                    room_id,
                    count: previous,
                })
            }
            StoreWrite::DeleteMembership { membership_id } => {
                let membership = self
                    .memberships
                    .remove(&membership_id)
                    .ok_or_else(RoomError::not_in_room)?;
                self.membership_by_user.remove(&membership.user_id);
                Ok(Undo::RestoreMembership(membership))
            }
        }
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::RemoveRoom(room_id) => {
                self.rooms.remove(&room_id);
            }
            Undo::RemoveMembership(membership_id) => {
                if let Some(membership) = self.memberships.remove(&membership_id) {
                    self.membership_by_user.remove(&membership.user_id);
                }
            }
            Undo::RestoreCount { room_id, count } => {
                if let Some(room) = self.rooms.get_mut(&room_id) {
                    room.participant_count = count;
                }
            }
            Undo::RestoreMembership(membership) => {
                self.membership_by_user
                    .insert(membership.user_id.clone(), membership.id);
                self.memberships.insert(membership.id, membership);
            }
        }
    }
}

/// In-process store for rooms, memberships and subjects.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rooms and memberships, read under one guard.
    ///
    /// Never observes part of a unit of work.
    pub async fn snapshot(&self) -> (Vec<Room>, Vec<Membership>) {
        let state = self.state.read().await;
        (
            state.rooms.values().cloned().collect(),
            state.memberships.values().cloned().collect(),
        )
    }
}

#[async_trait]
impl RoomStore for InMemoryStore {
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, RoomError> {
        Ok(self.state.read().await.rooms.get(&room_id).cloned())
    }

    async fn list_rooms(&self, subject: Option<&str>) -> Result<Vec<Room>, RoomError> {
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|room| subject.map_or(true, |s| room.subject == s))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }

    async fn get_membership_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Membership>, RoomError> {
        let state = self.state.read().await;
        Ok(state
            .membership_by_user
            .get(user_id)
            .and_then(|id| state.memberships.get(id))
            .cloned())
    }

    async fn list_memberships(&self, room_id: Uuid) -> Result<Vec<Membership>, RoomError> {
        let state = self.state.read().await;
        let mut memberships: Vec<Membership> = state
            .memberships
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        Ok(memberships)
    }

    #[instrument(skip_all, name = "room.repo.memory.commit", fields(writes = unit.writes().len()))]
    async fn commit(&self, unit: UnitOfWork) -> Result<(), RoomError> {
        let mut state = self.state.write().await;
        let mut undo_log = Vec::new();

        for write in unit.into_writes() {
            let kind = write.kind();
            match state.apply(write) {
                Ok(undo) => undo_log.push(undo),
                Err(e) => {
                    tracing::debug!(
                        target: "room.repository.memory",
                        write = kind,
                        error = %e,
                        "Write rejected, rolling back unit"
                    );
                    while let Some(undo) = undo_log.pop() {
                        state.revert(undo);
                    }
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[async_trait]
impl SubjectStore for InMemoryStore {
    async fn list_subjects(&self) -> Result<Vec<Subject>, RoomError> {
        let mut subjects = self.state.read().await.subjects.clone();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    async fn seed_subjects_if_empty(&self, subjects: Vec<Subject>) -> Result<u64, RoomError> {
        let mut state = self.state.write().await;
        if !state.subjects.is_empty() {
            return Ok(0);
        }
        let count = subjects.len() as u64;
        state.subjects = subjects;
        Ok(count)
    }
}
