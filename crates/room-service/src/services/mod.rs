//! Service layer for the room service.
//!
//! # Components
//!
//! - `clock` - time source for timestamps
//! - `key_locks` - per-key async locks used to serialize transitions
//! - `room_membership` - room creation, join and leave
//! - `subject_catalog` - default subject catalog

pub mod clock;
pub mod key_locks;
pub mod room_membership;
pub mod subject_catalog;

pub use clock::{Clock, FixedClock, SystemClock};
pub use key_locks::KeyedLocks;
pub use room_membership::{JoinOutcome, RoomMembershipService};
pub use subject_catalog::SubjectCatalogService;
