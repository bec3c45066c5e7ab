//! Observability for the room service.

pub mod metrics;
