//! PostgreSQL store tests.
//!
//! Need a live database: set `DATABASE_URL` and run with
//! `cargo test -p room-service --features postgres-tests`.

#![cfg(feature = "postgres-tests")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use chrono::{Duration, SubsecRound, Utc};
use room_service::errors::RoomError;
use room_service::models::{CreateRoomRequest, Membership, Room, Subject};
use room_service::repositories::{PgStore, RoomStore, SubjectStore, UnitOfWork};
use room_service::services::{JoinOutcome, RoomMembershipService, SystemClock};
use room_test_utils::TestRoomServer;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

fn room(max_participants: i32, participant_count: i32) -> Room {
    Room {
        id: Uuid::new_v4(),
        name: "Organic chemistry".to_string(),
        description: Some("Reaction mechanisms".to_string()),
        subject: "Chemistry".to_string(),
        max_participants,
        is_public: false,
        host_id: "h1".to_string(),
        participant_count,
        // Postgres stores microseconds
        created_at: Utc::now().trunc_subsecs(6),
    }
}

fn membership(room_id: Uuid, user_id: &str) -> Membership {
    Membership {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        room_id,
        joined_at: Utc::now(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_commit_and_read_back(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgStore::new(pool);
    let room = room(4, 1);

    store
        .commit(
            UnitOfWork::new()
                .insert_room(room.clone())
                .insert_membership(membership(room.id, "h1")),
        )
        .await?;

    let stored = store.get_room(room.id).await?.unwrap();
    assert_eq!(stored, room);

    let members = store.list_memberships(room.id).await?;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, "h1");

    let by_user = store.get_membership_by_user("h1").await?.unwrap();
    assert_eq!(by_user.room_id, room.id);

    assert!(store.ping().await);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_second_membership_for_user_is_conflict(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgStore::new(pool);
    let a = room(4, 0);
    let b = room(4, 0);
    store
        .commit(UnitOfWork::new().insert_room(a.clone()).insert_room(b.clone()))
        .await?;
    store
        .commit(UnitOfWork::new().insert_membership(membership(a.id, "u1")))
        .await?;

    let err = store
        .commit(UnitOfWork::new().insert_membership(membership(b.id, "u1")))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Conflict: User is already in another room");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_failed_unit_rolls_back(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgStore::new(pool);
    let room = room(2, 0);
    store
        .commit(UnitOfWork::new().insert_room(room.clone()))
        .await?;

    // Membership insert succeeds, count update violates capacity
    let err = store
        .commit(
            UnitOfWork::new()
                .insert_membership(membership(room.id, "u1"))
                .set_participant_count(room.id, 3),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Conflict: Room is full");

    assert!(store.get_membership_by_user("u1").await?.is_none());
    assert_eq!(
        store.get_room(room.id).await?.unwrap().participant_count,
        0
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_membership_for_missing_room_is_not_found(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgStore::new(pool);

    let err = store
        .commit(UnitOfWork::new().insert_membership(membership(Uuid::new_v4(), "u1")))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_rooms_filter_and_order(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgStore::new(pool);
    let mut first = room(4, 0);
    first.created_at -= Duration::minutes(5);
    let mut second = room(4, 0);
    second.subject = "Physics".to_string();

    store
        .commit(
            UnitOfWork::new()
                .insert_room(second.clone())
                .insert_room(first.clone()),
        )
        .await?;

    let all = store.list_rooms(None).await?;
    assert_eq!(
        all.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );

    let physics = store.list_rooms(Some("Physics")).await?;
    assert_eq!(physics.len(), 1);
    assert_eq!(physics[0].id, second.id);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_seed_subjects_once(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgStore::new(pool);
    let subjects = vec![
        Subject {
            id: Uuid::new_v4(),
            name: "Physics".to_string(),
            icon: "Atom".to_string(),
        },
        Subject {
            id: Uuid::new_v4(),
            name: "Art".to_string(),
            icon: "Palette".to_string(),
        },
    ];

    assert_eq!(store.seed_subjects_if_empty(subjects.clone()).await?, 2);
    assert_eq!(store.seed_subjects_if_empty(subjects).await?, 0);

    let listed = store.list_subjects().await?;
    assert_eq!(
        listed.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["Art", "Physics"]
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_membership_service_over_postgres(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = Arc::new(PgStore::new(pool));
    let service = Arc::new(RoomMembershipService::new(
        store.clone(),
        Arc::new(SystemClock),
    ));

    let room = service
        .create_room(CreateRoomRequest {
            name: "Last seat".to_string(),
            description: None,
            subject: "Music".to_string(),
            max_participants: 2,
            is_public: true,
            host_id: "host".to_string(),
        })
        .await?;

    let joins = (0..8).map(|i| {
        let service = Arc::clone(&service);
        let room_id = room.id;
        tokio::spawn(async move { service.join_room(room_id, &format!("user-{i}")).await })
    });
    let admitted = futures::future::join_all(joins)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(JoinOutcome::Joined))))
        .count();
    assert_eq!(admitted, 1);

    let stored = store.get_room(room.id).await?.unwrap();
    assert_eq!(stored.participant_count, 2);
    assert_eq!(store.list_memberships(room.id).await?.len(), 2);

    service.leave_room(room.id, "host").await?;
    let stored = store.get_room(room.id).await?.unwrap();
    assert_eq!(stored.participant_count, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_http_server_over_postgres(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn_with_store(Arc::new(PgStore::new(pool)), "postgres").await?;
    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["backend"], "postgres");

    let subjects: Vec<serde_json::Value> = client
        .get(format!("{}/api/v1/subjects", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(subjects.len(), 10);

    Ok(())
}
