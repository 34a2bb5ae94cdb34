use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{Exercise, ExerciseID, ReadError, StorageError, WriteError};

/// Catalog reads offered to the application.
#[allow(async_fn_in_trait)]
pub trait CatalogService {
    async fn get_exercises(&self, cursor: Option<Cursor>) -> Result<Vec<Exercise>, ReadError>;
    async fn get_exercises_by_body_part(
        &self,
        body_part: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, ReadError>;
    async fn get_exercises_by_target(
        &self,
        target: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, ReadError>;
    async fn get_exercises_by_equipment(
        &self,
        equipment: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, ReadError>;
    async fn get_exercise(&self, id: &ExerciseID) -> Result<Exercise, ReadError>;
    async fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>, ReadError>;

    async fn get_body_parts(&self) -> Result<Vec<String>, ReadError>;
    async fn get_targets(&self) -> Result<Vec<String>, ReadError>;
    async fn get_equipment(&self) -> Result<Vec<String>, ReadError>;

    async fn is_data_available(&self) -> Result<bool, ReadError>;
    async fn get_last_sync(&self) -> Result<Option<DateTime<Utc>>, ReadError>;
    async fn get_exercise_count(&self) -> Result<usize, ReadError>;
}

/// Read access to the remote exercise catalog.
///
/// Implementations must not retry. Every failure is surfaced as the matching [`StorageError`]
/// kind so that callers can decide whether to fall back to a cache.
#[allow(async_fn_in_trait)]
pub trait RemoteCatalogRepository {
    async fn fetch_exercises(&self, cursor: Option<Cursor>) -> Result<Vec<Exercise>, StorageError>;
    async fn fetch_exercises_by_body_part(
        &self,
        body_part: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, StorageError>;
    async fn fetch_exercises_by_target(
        &self,
        target: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, StorageError>;
    async fn fetch_exercises_by_equipment(
        &self,
        equipment: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, StorageError>;
    async fn fetch_exercise(&self, id: &ExerciseID) -> Result<Exercise, StorageError>;
    /// Searches a bounded part of the catalog.
    ///
    /// The result may be a subset of what [`LocalCatalogRepository::search_exercises`] returns
    /// for a fully synced cache.
    async fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>, StorageError>;

    async fn fetch_body_parts(&self) -> Result<Vec<String>, StorageError>;
    async fn fetch_targets(&self) -> Result<Vec<String>, StorageError>;
    async fn fetch_equipment(&self) -> Result<Vec<String>, StorageError>;
}

/// The on-device mirror of the catalog.
///
/// Exercises are keyed by their identifier. Lists are ordered by name, taxonomy lists are
/// distinct and sorted. A completed write is visible to every subsequent read.
#[allow(async_fn_in_trait)]
pub trait LocalCatalogRepository {
    async fn read_exercises(&self) -> Result<Vec<Exercise>, ReadError>;
    async fn read_exercises_by_body_part(&self, body_part: &str)
    -> Result<Vec<Exercise>, ReadError>;
    async fn read_exercises_by_target(&self, target: &str) -> Result<Vec<Exercise>, ReadError>;
    async fn read_exercises_by_equipment(
        &self,
        equipment: &str,
    ) -> Result<Vec<Exercise>, ReadError>;
    async fn read_exercise(&self, id: &ExerciseID) -> Result<Option<Exercise>, ReadError>;
    async fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>, ReadError>;

    async fn read_body_parts(&self) -> Result<Vec<String>, ReadError>;
    async fn read_targets(&self) -> Result<Vec<String>, ReadError>;
    async fn read_equipment(&self) -> Result<Vec<String>, ReadError>;

    async fn count_exercises(&self) -> Result<usize, ReadError>;
    async fn read_snapshot(&self) -> Result<Option<CatalogSnapshot>, ReadError>;

    /// Inserts the exercises, replacing stored exercises with the same identifier.
    async fn upsert_exercises(&self, exercises: &[Exercise]) -> Result<(), WriteError>;
    /// Deletes every exercise whose identifier is not contained in `ids` and returns the
    /// number of deleted exercises.
    async fn retain_exercises(&self, ids: &HashSet<ExerciseID>) -> Result<usize, WriteError>;
    async fn clear_exercises(&self) -> Result<(), WriteError>;
    async fn write_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<(), WriteError>;

    async fn read_last_sync(&self) -> Result<Option<DateTime<Utc>>, ReadError> {
        Ok(self.read_snapshot().await?.map(|s| s.last_synced))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub limit: u32,
    pub offset: u32,
}

impl Cursor {
    #[must_use]
    pub const fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    #[must_use]
    pub const fn first(limit: u32) -> Self {
        Self::new(limit, 0)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.limit, self.offset.saturating_add(self.limit))
    }

    /// Returns the window of `items` selected by this cursor.
    #[must_use]
    pub fn apply<T>(self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub exercise_count: usize,
    pub last_synced: DateTime<Utc>,
}
