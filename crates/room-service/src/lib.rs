//! Room Service Library
//!
//! Manages capacity-bounded study rooms and the users occupying them:
//!
//! - Room creation, with the host admitted as the first participant
//! - Joining and leaving rooms under a fixed capacity
//! - Room, participant and user-status queries
//! - A default subject catalog
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! `RoomMembershipService` is the only writer of room and membership state.
//! It serializes transitions with per-user and per-room locks and commits each
//! transition as one unit of work against a `RoomStore` (PostgreSQL or
//! in-process).
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Data models
//! - `observability` - Prometheus metrics
//! - `repositories` - Store contract and backends
//! - `routes` - Axum router setup
//! - `services` - Membership and catalog services

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
