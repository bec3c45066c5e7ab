//! Room membership service.
//!
//! The only writer of room and membership state. Every state transition
//! (create, join, leave) runs under per-key locks and commits its writes as a
//! single [`UnitOfWork`], which keeps two properties true at every commit:
//!
//! - a room's `participant_count` equals its number of live memberships
//! - a user holds at most one live membership
//!
//! # Locking
//!
//! Transitions take the user lock first and the room lock second, at most one
//! of each, so no two transitions can wait on each other in a cycle. Holding
//! the room lock serializes every admission into that room; holding the user
//! lock serializes every transition of that user across rooms. Reads are
//! taken after both locks are held, so the checks and the commit see the
//! same state.

use crate::errors::RoomError;
use crate::models::{CreateRoomRequest, Membership, Room, UserRoomStatus};
use crate::observability::metrics;
use crate::repositories::{RoomStore, UnitOfWork};
use crate::services::clock::Clock;
use crate::services::key_locks::KeyedLocks;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Result of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new membership was created.
    Joined,
    /// The user was already in this room. Nothing changed.
    AlreadyMember,
}

impl JoinOutcome {
    pub fn joined(self) -> bool {
        matches!(self, JoinOutcome::Joined)
    }
}

/// What a join would do, decided against a consistent view of the room and
/// the user's membership.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JoinPlan {
    AlreadyMember,
    Admit {
        membership: Membership,
        new_count: i32,
    },
}

/// Decide how `user_id` enters `room`.
///
/// Checks, first failure wins: an existing membership in this room is an
/// idempotent no-op, one in another room is a conflict, and a room at
/// capacity is a conflict.
fn plan_join(
    room: &Room,
    existing: Option<&Membership>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<JoinPlan, RoomError> {
    match existing {
        Some(membership) if membership.room_id == room.id => return Ok(JoinPlan::AlreadyMember),
        Some(_) => return Err(RoomError::already_in_another_room()),
        None => {}
    }

    if !room.has_capacity() {
        return Err(RoomError::room_full());
    }

    Ok(JoinPlan::Admit {
        membership: Membership {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            room_id: room.id,
            joined_at: now,
        },
        new_count: room.participant_count + 1,
    })
}

fn require_user_id(user_id: &str) -> Result<(), RoomError> {
    if user_id.trim().is_empty() {
        return Err(RoomError::Validation("User ID is required".to_string()));
    }
    Ok(())
}

fn outcome_label<T>(result: &Result<T, RoomError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    }
}

/// Manages rooms and the users occupying them.
pub struct RoomMembershipService {
    store: Arc<dyn RoomStore>,
    clock: Arc<dyn Clock>,
    user_locks: KeyedLocks<String>,
    room_locks: KeyedLocks<Uuid>,
}

impl RoomMembershipService {
    pub fn new(store: Arc<dyn RoomStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            user_locks: KeyedLocks::new(),
            room_locks: KeyedLocks::new(),
        }
    }

    /// Create a room and admit its host as the first participant.
    ///
    /// The room and the host membership are committed together; callers
    /// never observe the room without its host.
    ///
    /// # Errors
    ///
    /// - `RoomError::Validation` - a request field is invalid (nothing is
    ///   persisted)
    /// - `RoomError::Conflict` - the host is already in another room
    /// - `RoomError::Database` - store failure
    #[instrument(skip_all, name = "room.membership.create", fields(host_id = %request.host_id))]
    pub async fn create_room(&self, request: CreateRoomRequest) -> Result<Room, RoomError> {
        let start = Instant::now();
        let result = self.create_room_locked(request).await;
        metrics::record_membership_transition("create", outcome_label(&result), start.elapsed());
        if result.is_ok() {
            metrics::record_room_created();
        }
        result
    }

    async fn create_room_locked(&self, request: CreateRoomRequest) -> Result<Room, RoomError> {
        request
            .validate()
            .map_err(|e| RoomError::Validation(e.to_string()))?;

        // The new room id is unknown to anyone else until commit, so only the
        // host needs to be locked.
        let _user_guard = self.user_locks.lock(request.host_id.clone()).await;

        let existing = self.store.get_membership_by_user(&request.host_id).await?;
        let now = self.clock.now();

        let mut room = Room {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            subject: request.subject,
            max_participants: request.max_participants,
            is_public: request.is_public,
            host_id: request.host_id,
            participant_count: 0,
            created_at: now,
        };

        let (membership, new_count) =
            match plan_join(&room, existing.as_ref(), &room.host_id, now)? {
                JoinPlan::Admit {
                    membership,
                    new_count,
                } => (membership, new_count),
                JoinPlan::AlreadyMember => {
                    return Err(RoomError::Database(format!(
                        "membership already references new room {}",
                        room.id
                    )));
                }
            };
        room.participant_count = new_count;

        self.store
            .commit(
                UnitOfWork::new()
                    .insert_room(room.clone())
                    .insert_membership(membership),
            )
            .await?;

        tracing::info!(
            target: "room.service.membership",
            room_id = %room.id,
            host_id = %room.host_id,
            max_participants = room.max_participants,
            "Room created"
        );

        Ok(room)
    }

    /// Admit `user_id` into `room_id`.
    ///
    /// Joining a room the user is already in succeeds without changing
    /// anything.
    ///
    /// # Errors
    ///
    /// - `RoomError::NotFound` - the room does not exist
    /// - `RoomError::Conflict` - the user is in another room, or the room is
    ///   full
    /// - `RoomError::Database` - store failure
    #[instrument(
        skip_all,
        name = "room.membership.join",
        fields(room_id = %room_id, user_id = %user_id)
    )]
    pub async fn join_room(&self, room_id: Uuid, user_id: &str) -> Result<JoinOutcome, RoomError> {
        let start = Instant::now();
        let result = self.join_room_locked(room_id, user_id).await;
        let outcome = match &result {
            Ok(JoinOutcome::AlreadyMember) => "noop",
            other => outcome_label(other),
        };
        metrics::record_membership_transition("join", outcome, start.elapsed());
        result
    }

    async fn join_room_locked(
        &self,
        room_id: Uuid,
        user_id: &str,
    ) -> Result<JoinOutcome, RoomError> {
        // A blank user id is rejected before the room lookup
        require_user_id(user_id)?;

        let _user_guard = self.user_locks.lock(user_id.to_string()).await;
        let _room_guard = self.room_locks.lock(room_id).await;

        let room = self
            .store
            .get_room(room_id)
            .await?
            .ok_or_else(RoomError::room_not_found)?;
        let existing = self.store.get_membership_by_user(user_id).await?;

        match plan_join(&room, existing.as_ref(), user_id, self.clock.now())? {
            JoinPlan::AlreadyMember => {
                tracing::debug!(
                    target: "room.service.membership",
                    room_id = %room_id,
                    user_id = %user_id,
                    "User already in room"
                );
                Ok(JoinOutcome::AlreadyMember)
            }
            JoinPlan::Admit {
                membership,
                new_count,
            } => {
                self.store
                    .commit(
                        UnitOfWork::new()
                            .insert_membership(membership)
                            .set_participant_count(room_id, new_count),
                    )
                    .await?;

                tracing::info!(
                    target: "room.service.membership",
                    room_id = %room_id,
                    user_id = %user_id,
                    participant_count = new_count,
                    "User joined room"
                );
                Ok(JoinOutcome::Joined)
            }
        }
    }

    /// Remove `user_id` from `room_id`.
    ///
    /// If the room record is missing the membership is still deleted and
    /// `RoomError::NotFound` is returned. The participant count never goes
    /// below zero.
    ///
    /// # Errors
    ///
    /// - `RoomError::Conflict` - the user is not in this room
    /// - `RoomError::NotFound` - the membership pointed at a missing room
    /// - `RoomError::Database` - store failure
    #[instrument(
        skip_all,
        name = "room.membership.leave",
        fields(room_id = %room_id, user_id = %user_id)
    )]
    pub async fn leave_room(&self, room_id: Uuid, user_id: &str) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = self.leave_room_locked(room_id, user_id).await;
        metrics::record_membership_transition("leave", outcome_label(&result), start.elapsed());
        result
    }

    async fn leave_room_locked(&self, room_id: Uuid, user_id: &str) -> Result<(), RoomError> {
        require_user_id(user_id)?;

        let _user_guard = self.user_locks.lock(user_id.to_string()).await;
        let _room_guard = self.room_locks.lock(room_id).await;

        let membership = match self.store.get_membership_by_user(user_id).await? {
            Some(membership) if membership.room_id == room_id => membership,
            _ => return Err(RoomError::not_in_room()),
        };

        let Some(room) = self.store.get_room(room_id).await? else {
            self.store
                .commit(UnitOfWork::new().delete_membership(membership.id))
                .await?;
            tracing::warn!(
                target: "room.service.membership",
                room_id = %room_id,
                user_id = %user_id,
                "Removed membership referencing a missing room"
            );
            return Err(RoomError::room_not_found());
        };

        let new_count = (room.participant_count - 1).max(0);
        self.store
            .commit(
                UnitOfWork::new()
                    .delete_membership(membership.id)
                    .set_participant_count(room_id, new_count),
            )
            .await?;

        tracing::info!(
            target: "room.service.membership",
            room_id = %room_id,
            user_id = %user_id,
            participant_count = new_count,
            "User left room"
        );

        Ok(())
    }

    /// Get a room by id.
    ///
    /// # Errors
    ///
    /// - `RoomError::NotFound` - the room does not exist
    #[instrument(skip_all, name = "room.membership.get_room", fields(room_id = %room_id))]
    pub async fn get_room(&self, room_id: Uuid) -> Result<Room, RoomError> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or_else(RoomError::room_not_found)
    }

    /// List rooms, optionally only those whose subject equals `subject`.
    ///
    /// An empty filter lists every room.
    #[instrument(skip_all, name = "room.membership.list_rooms")]
    pub async fn list_rooms(&self, subject: Option<&str>) -> Result<Vec<Room>, RoomError> {
        let subject = subject.filter(|s| !s.is_empty());
        self.store.list_rooms(subject).await
    }

    /// List a room's memberships in join order.
    ///
    /// An unknown room has no participants.
    #[instrument(skip_all, name = "room.membership.list_participants", fields(room_id = %room_id))]
    pub async fn list_participants(&self, room_id: Uuid) -> Result<Vec<Membership>, RoomError> {
        self.store.list_memberships(room_id).await
    }

    /// Whether `user_id` is in a room, and which.
    #[instrument(skip_all, name = "room.membership.user_status", fields(user_id = %user_id))]
    pub async fn get_user_room_status(&self, user_id: &str) -> Result<UserRoomStatus, RoomError> {
        let membership = self.store.get_membership_by_user(user_id).await?;
        Ok(UserRoomStatus::from_membership(user_id, membership.as_ref()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryStore;
    use crate::services::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn service_with(store: Arc<dyn RoomStore>) -> RoomMembershipService {
        RoomMembershipService::new(store, Arc::new(FixedClock(fixed_now())))
    }

    fn service() -> (RoomMembershipService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (service_with(store.clone()), store)
    }

    fn request(host_id: &str, max_participants: i32) -> CreateRoomRequest {
        CreateRoomRequest {
            name: " Linear Algebra ".to_string(),
            description: Some("Eigenvalues".to_string()),
            subject: "Mathematics".to_string(),
            max_participants,
            is_public: true,
            host_id: host_id.to_string(),
        }
    }

    fn room(max_participants: i32, participant_count: i32) -> Room {
        Room {
            id: Uuid::new_v4(),
            name: "Room".to_string(),
            description: None,
            subject: "Physics".to_string(),
            max_participants,
            is_public: true,
            host_id: "h".to_string(),
            participant_count,
            created_at: fixed_now(),
        }
    }

    fn membership_in(room_id: Uuid, user_id: &str) -> Membership {
        Membership {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            room_id,
            joined_at: fixed_now(),
        }
    }

    #[test]
    fn test_plan_join_admits_into_free_room() {
        let room = room(3, 1);
        let plan = plan_join(&room, None, "u1", fixed_now()).unwrap();

        match plan {
            JoinPlan::Admit {
                membership,
                new_count,
            } => {
                assert_eq!(new_count, 2);
                assert_eq!(membership.room_id, room.id);
                assert_eq!(membership.user_id, "u1");
                assert_eq!(membership.joined_at, fixed_now());
            }
            JoinPlan::AlreadyMember => panic!("expected admission"),
        }
    }

    #[test]
    fn test_plan_join_same_room_is_noop_even_when_full() {
        let room = room(2, 2);
        let existing = membership_in(room.id, "u1");

        let plan = plan_join(&room, Some(&existing), "u1", fixed_now()).unwrap();
        assert_eq!(plan, JoinPlan::AlreadyMember);
    }

    #[test]
    fn test_plan_join_other_room_wins_over_full() {
        let room = room(2, 2);
        let existing = membership_in(Uuid::new_v4(), "u1");

        let err = plan_join(&room, Some(&existing), "u1", fixed_now()).unwrap_err();
        assert_eq!(err.to_string(), "Conflict: User is already in another room");
    }

    #[test]
    fn test_plan_join_full_room() {
        let room = room(2, 2);
        let err = plan_join(&room, None, "u1", fixed_now()).unwrap_err();
        assert_eq!(err.to_string(), "Conflict: Room is full");
    }

    #[tokio::test]
    async fn test_create_room_admits_host() {
        let (service, store) = service();

        let room = service.create_room(request("h1", 4)).await.unwrap();

        assert_eq!(room.participant_count, 1);
        assert_eq!(room.name, "Linear Algebra");
        assert_eq!(room.created_at, fixed_now());

        let stored = store.get_room(room.id).await.unwrap().unwrap();
        assert_eq!(stored, room);

        let status = service.get_user_room_status("h1").await.unwrap();
        assert!(status.in_room);
        assert_eq!(status.room_id, Some(room.id));
    }

    #[tokio::test]
    async fn test_create_room_validation_persists_nothing() {
        let (service, store) = service();

        let err = service.create_room(request("h1", 1)).await.unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));

        assert!(store.list_rooms(None).await.unwrap().is_empty());
        assert!(store.get_membership_by_user("h1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_room_host_elsewhere_is_conflict() {
        let (service, store) = service();
        let first = service.create_room(request("h1", 4)).await.unwrap();

        let err = service.create_room(request("h1", 4)).await.unwrap_err();
        assert!(matches!(err, RoomError::Conflict(_)));

        let rooms = store.list_rooms(None).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, first.id);
    }

    #[tokio::test]
    async fn test_join_then_rejoin_is_idempotent() {
        let (service, _store) = service();
        let room = service.create_room(request("h1", 4)).await.unwrap();

        let first = service.join_room(room.id, "u1").await.unwrap();
        let second = service.join_room(room.id, "u1").await.unwrap();

        assert_eq!(first, JoinOutcome::Joined);
        assert_eq!(second, JoinOutcome::AlreadyMember);
        assert!(first.joined());
        assert!(!second.joined());

        let room = service.get_room(room.id).await.unwrap();
        assert_eq!(room.participant_count, 2);
        assert_eq!(service.list_participants(room.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_join_missing_room_is_not_found() {
        let (service, _store) = service();

        let err = service.join_room(Uuid::new_v4(), "u1").await.unwrap_err();
        assert!(matches!(err, RoomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_join_full_room_is_conflict() {
        let (service, _store) = service();
        let room = service.create_room(request("h1", 2)).await.unwrap();
        service.join_room(room.id, "u1").await.unwrap();

        let err = service.join_room(room.id, "u2").await.unwrap_err();
        assert_eq!(err.to_string(), "Conflict: Room is full");

        let room = service.get_room(room.id).await.unwrap();
        assert_eq!(room.participant_count, 2);
    }

    #[tokio::test]
    async fn test_join_second_room_is_conflict() {
        let (service, _store) = service();
        let a = service.create_room(request("h1", 4)).await.unwrap();
        let b = service.create_room(request("h2", 4)).await.unwrap();
        service.join_room(a.id, "u1").await.unwrap();

        let err = service.join_room(b.id, "u1").await.unwrap_err();
        assert_eq!(err.to_string(), "Conflict: User is already in another room");

        let status = service.get_user_room_status("u1").await.unwrap();
        assert_eq!(status.room_id, Some(a.id));
        assert_eq!(service.get_room(b.id).await.unwrap().participant_count, 1);
    }

    #[tokio::test]
    async fn test_join_blank_user_is_validation() {
        let (service, _store) = service();
        let room = service.create_room(request("h1", 4)).await.unwrap();

        let err = service.join_room(room.id, "  ").await.unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));

        let err = service.join_room(Uuid::new_v4(), "").await.unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
    }

    #[tokio::test]
    async fn test_leave_restores_count() {
        let (service, _store) = service();
        let room = service.create_room(request("h1", 4)).await.unwrap();
        service.join_room(room.id, "u1").await.unwrap();

        service.leave_room(room.id, "u1").await.unwrap();

        let room = service.get_room(room.id).await.unwrap();
        assert_eq!(room.participant_count, 1);
        let status = service.get_user_room_status("u1").await.unwrap();
        assert!(!status.in_room);
        assert_eq!(status.room_id, None);
    }

    #[tokio::test]
    async fn test_leave_without_membership_is_conflict() {
        let (service, _store) = service();
        let room = service.create_room(request("h1", 4)).await.unwrap();

        let err = service.leave_room(room.id, "u1").await.unwrap_err();
        assert_eq!(err.to_string(), "Conflict: User is not in this room");
    }

    #[tokio::test]
    async fn test_leave_wrong_room_is_conflict() {
        let (service, _store) = service();
        let a = service.create_room(request("h1", 4)).await.unwrap();
        let b = service.create_room(request("h2", 4)).await.unwrap();

        let err = service.leave_room(b.id, "h1").await.unwrap_err();
        assert!(matches!(err, RoomError::Conflict(_)));

        // Nothing changed in either room
        assert_eq!(service.get_room(a.id).await.unwrap().participant_count, 1);
        assert_eq!(service.get_room(b.id).await.unwrap().participant_count, 1);
    }

    #[tokio::test]
    async fn test_host_can_leave_and_room_stays() {
        let (service, _store) = service();
        let room = service.create_room(request("h1", 4)).await.unwrap();

        service.leave_room(room.id, "h1").await.unwrap();

        let room = service.get_room(room.id).await.unwrap();
        assert_eq!(room.participant_count, 0);
        assert!(service.list_participants(room.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_leave_floors_drifted_count_at_zero() {
        let (service, store) = service();
        let room = service.create_room(request("h1", 4)).await.unwrap();

        // Simulate accounting drift
        store
            .commit(UnitOfWork::new().set_participant_count(room.id, 0))
            .await
            .unwrap();

        service.leave_room(room.id, "h1").await.unwrap();
        assert_eq!(service.get_room(room.id).await.unwrap().participant_count, 0);
    }

    #[tokio::test]
    async fn test_list_rooms_empty_filter_is_unfiltered() {
        let (service, _store) = service();
        service.create_room(request("h1", 4)).await.unwrap();
        let mut physics = request("h2", 4);
        physics.subject = "Physics".to_string();
        service.create_room(physics).await.unwrap();

        assert_eq!(service.list_rooms(None).await.unwrap().len(), 2);
        assert_eq!(service.list_rooms(Some("")).await.unwrap().len(), 2);

        let filtered = service.list_rooms(Some("Physics")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].subject, "Physics");

        assert!(service.list_rooms(Some("physics")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_room_missing_is_not_found() {
        let (service, _store) = service();
        let err = service.get_room(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RoomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_participants_unknown_room_is_empty() {
        let (service, _store) = service();
        assert!(service
            .list_participants(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    /// Store whose reads see an existing membership pointing at a room that
    /// is gone.
    struct DanglingMembershipStore {
        inner: InMemoryStore,
        membership: Membership,
        committed: std::sync::Mutex<Vec<UnitOfWork>>,
    }

    #[async_trait]
    impl RoomStore for DanglingMembershipStore {
        async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, RoomError> {
            self.inner.get_room(room_id).await
        }
        async fn list_rooms(&self, subject: Option<&str>) -> Result<Vec<Room>, RoomError> {
            self.inner.list_rooms(subject).await
        }
        async fn get_membership_by_user(
            &self,
            user_id: &str,
        ) -> Result<Option<Membership>, RoomError> {
            Ok((user_id == self.membership.user_id).then(|| self.membership.clone()))
        }
        async fn list_memberships(&self, room_id: Uuid) -> Result<Vec<Membership>, RoomError> {
            self.inner.list_memberships(room_id).await
        }
        async fn commit(&self, unit: UnitOfWork) -> Result<(), RoomError> {
            self.committed.lock().unwrap().push(unit);
            Ok(())
        }
        async fn ping(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_leave_missing_room_deletes_membership_and_reports_not_found() {
        let membership = membership_in(Uuid::new_v4(), "u1");
        let store = Arc::new(DanglingMembershipStore {
            inner: InMemoryStore::new(),
            membership: membership.clone(),
            committed: std::sync::Mutex::new(Vec::new()),
        });
        let service = service_with(store.clone());

        let err = service
            .leave_room(membership.room_id, "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::NotFound(_)));

        // The membership is removed and no count is touched
        let committed = store.committed.lock().unwrap().clone();
        assert_eq!(
            committed,
            vec![UnitOfWork::new().delete_membership(membership.id)]
        );
    }

    /// Store that rejects every commit.
    struct FailingCommitStore {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl RoomStore for FailingCommitStore {
        async fn get_room(&self, room_id: Uuid) -> Result<Option<Room>, RoomError> {
            self.inner.get_room(room_id).await
        }
        async fn list_rooms(&self, subject: Option<&str>) -> Result<Vec<Room>, RoomError> {
            self.inner.list_rooms(subject).await
        }
        async fn get_membership_by_user(
            &self,
            user_id: &str,
        ) -> Result<Option<Membership>, RoomError> {
            self.inner.get_membership_by_user(user_id).await
        }
        async fn list_memberships(&self, room_id: Uuid) -> Result<Vec<Membership>, RoomError> {
            self.inner.list_memberships(room_id).await
        }
        async fn commit(&self, _unit: UnitOfWork) -> Result<(), RoomError> {
            Err(RoomError::Database("connection reset".to_string()))
        }
        async fn ping(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_untouched() {
        let inner = InMemoryStore::new();
        let room = room(4, 0);
        inner
            .commit(UnitOfWork::new().insert_room(room.clone()))
            .await
            .unwrap();
        let store = Arc::new(FailingCommitStore { inner });
        let service = service_with(store.clone());

        let err = service.join_room(room.id, "u1").await.unwrap_err();
        assert!(matches!(err, RoomError::Database(_)));

        let err = service.create_room(request("h1", 4)).await.unwrap_err();
        assert!(matches!(err, RoomError::Database(_)));

        assert_eq!(
            store.get_room(room.id).await.unwrap().unwrap().participant_count,
            0
        );
        assert!(store.get_membership_by_user("u1").await.unwrap().is_none());
        assert_eq!(store.list_rooms(None).await.unwrap().len(), 1);
    }
}
