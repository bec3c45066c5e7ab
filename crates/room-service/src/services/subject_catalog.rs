//! Subject catalog.
//!
//! Subjects are reference data for clients choosing what a room studies.
//! Rooms never consult the catalog: a room's subject is free-form.

use crate::errors::RoomError;
use crate::models::Subject;
use crate::repositories::SubjectStore;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Default catalog as `(name, icon)` pairs.
pub const DEFAULT_SUBJECTS: &[(&str, &str)] = &[
    ("Mathematics", "Calculator"),
    ("Physics", "Atom"),
    ("Chemistry", "FlaskConical"),
    ("Biology", "Dna"),
    ("Computer Science", "Laptop"),
    ("Literature", "Book"),
    ("History", "Landmark"),
    ("Geography", "Globe"),
    ("Art", "Palette"),
    ("Music", "Music"),
];

/// Build the default catalog with fresh ids.
pub fn default_subjects() -> Vec<Subject> {
    DEFAULT_SUBJECTS
        .iter()
        .map(|(name, icon)| Subject {
            id: Uuid::new_v4(),
            name: (*name).to_string(),
            icon: (*icon).to_string(),
        })
        .collect()
}

pub struct SubjectCatalogService {
    store: Arc<dyn SubjectStore>,
}

impl SubjectCatalogService {
    pub fn new(store: Arc<dyn SubjectStore>) -> Self {
        Self { store }
    }

    /// Seed the default catalog if it is empty. Safe to run on every start.
    ///
    /// Returns the number of subjects inserted.
    #[instrument(skip_all, name = "room.catalog.seed")]
    pub async fn seed_defaults(&self) -> Result<u64, RoomError> {
        let inserted = self.store.seed_subjects_if_empty(default_subjects()).await?;

        if inserted > 0 {
            tracing::info!(target: "room.service.catalog", inserted, "Seeded default subjects");
        } else {
            tracing::debug!(target: "room.service.catalog", "Subject catalog already populated");
        }

        Ok(inserted)
    }

    /// List subjects ordered by name.
    #[instrument(skip_all, name = "room.catalog.list")]
    pub async fn list(&self) -> Result<Vec<Subject>, RoomError> {
        self.store.list_subjects().await
    }
}
