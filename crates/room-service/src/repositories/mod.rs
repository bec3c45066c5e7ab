//! Repository layer for the room service.
//!
//! Defines the store contract consumed by the membership service and its two
//! backends. All mutations go through [`UnitOfWork`], which a backend applies
//! all-or-nothing.
//!
//! - `postgres` - sqlx/PostgreSQL backend, one transaction per unit
//! - `memory` - in-process backend for single-node and test deployments

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use store::{RoomStore, StoreWrite, SubjectStore, UnitOfWork};
