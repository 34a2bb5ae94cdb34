use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, warn};

use crate::{
    CatalogService, CatalogSnapshot, CatalogSync, Cursor, Exercise, ExerciseID,
    LocalCatalogRepository, ReadError, RemoteCatalogRepository, StorageError, SyncError,
    SyncSettings,
};

/// Serves catalog reads from the remote catalog and falls back to the local catalog if the
/// remote catalog is unavailable.
///
/// Remote results are never cached by the service itself. The local catalog is kept warm by
/// the sync engine, which runs before reading the full list of exercises.
pub struct Service<R, L> {
    remote: Arc<R>,
    local: Option<Arc<L>>,
    sync: Option<CatalogSync<R, L>>,
}

impl<R, L> Service<R, L>
where
    R: RemoteCatalogRepository,
    L: LocalCatalogRepository,
{
    /// Creates a service without a local catalog. Every remote failure is final.
    pub fn new(remote: R) -> Self {
        Self {
            remote: Arc::new(remote),
            local: None,
            sync: None,
        }
    }

    pub fn with_cache(remote: R, local: L, settings: SyncSettings) -> Self {
        let remote = Arc::new(remote);
        let local = Arc::new(local);
        Self {
            sync: Some(CatalogSync::new(
                Arc::clone(&remote),
                Arc::clone(&local),
                settings,
            )),
            remote,
            local: Some(local),
        }
    }

    #[must_use]
    pub fn catalog_sync(&self) -> Option<&CatalogSync<R, L>> {
        self.sync.as_ref()
    }

    pub async fn sync_if_needed(&self) -> Result<Option<CatalogSnapshot>, SyncError> {
        match self.sync {
            Some(ref sync) => sync.sync_if_needed().await,
            None => Ok(None),
        }
    }

    pub async fn force_sync(&self) -> Result<CatalogSnapshot, SyncError> {
        match self.sync {
            Some(ref sync) => sync.force_sync().await,
            None => Err(SyncError::NoCache),
        }
    }
}

fn log_fallback(err: &StorageError, entity: &str) {
    if err.is_transport() {
        debug!("failed to fetch {entity}, reading cache: {err}");
    } else {
        warn!("failed to fetch {entity}, reading cache: {err}");
    }
}

macro_rules! log_on_error {
    ($func: expr, $action: literal, $entity: literal) => {{
        let result = $func;
        match result {
            Ok(_) => {}
            Err(ref err) => match err {
                ReadError::FallbackExhausted(StorageError::NoConnection) => {
                    debug!("failed to {} {}: {err}", $action, $entity);
                }
                _ => {
                    error!("failed to {} {}: {err}", $action, $entity);
                }
            },
        }
        result
    }};
}

macro_rules! fallback {
    ($self: ident, $fetch: ident($($fetch_arg: expr),*), $read: ident($($read_arg: expr),*), $entity: literal $(, $cursor: ident)?) => {{
        match $self.remote.$fetch($($fetch_arg),*).await {
            Ok(result) => Ok(result),
            Err(err) => match $self.local {
                Some(ref local) => {
                    log_fallback(&err, $entity);
                    let result = local.$read($($read_arg),*).await;
                    $(let result = result.map(|exercises| page($cursor, exercises));)?
                    result
                }
                None => Err(ReadError::FallbackExhausted(err)),
            },
        }
    }};
}

fn page<T>(cursor: Option<Cursor>, items: Vec<T>) -> Vec<T> {
    match cursor {
        Some(cursor) => cursor.apply(items),
        None => items,
    }
}

impl<R, L> CatalogService for Service<R, L>
where
    R: RemoteCatalogRepository,
    L: LocalCatalogRepository,
{
    async fn get_exercises(&self, cursor: Option<Cursor>) -> Result<Vec<Exercise>, ReadError> {
        if let Err(err) = self.sync_if_needed().await {
            warn!("failed to sync exercises: {err}");
        }
        log_on_error!(
            fallback!(
                self,
                fetch_exercises(cursor),
                read_exercises(),
                "exercises",
                cursor
            ),
            "get",
            "exercises"
        )
    }

    async fn get_exercises_by_body_part(
        &self,
        body_part: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            fallback!(
                self,
                fetch_exercises_by_body_part(body_part, cursor),
                read_exercises_by_body_part(body_part),
                "exercises by body part",
                cursor
            ),
            "get",
            "exercises by body part"
        )
    }

    async fn get_exercises_by_target(
        &self,
        target: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            fallback!(
                self,
                fetch_exercises_by_target(target, cursor),
                read_exercises_by_target(target),
                "exercises by target",
                cursor
            ),
            "get",
            "exercises by target"
        )
    }

    async fn get_exercises_by_equipment(
        &self,
        equipment: &str,
        cursor: Option<Cursor>,
    ) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            fallback!(
                self,
                fetch_exercises_by_equipment(equipment, cursor),
                read_exercises_by_equipment(equipment),
                "exercises by equipment",
                cursor
            ),
            "get",
            "exercises by equipment"
        )
    }

    async fn get_exercise(&self, id: &ExerciseID) -> Result<Exercise, ReadError> {
        let result = match self.remote.fetch_exercise(id).await {
            Ok(exercise) => Ok(exercise),
            Err(err) => match self.local {
                Some(ref local) => {
                    log_fallback(&err, "exercise");
                    local
                        .read_exercise(id)
                        .await
                        .and_then(|exercise| exercise.ok_or(ReadError::NotFound))
                }
                None if matches!(err, StorageError::NotFound) => Err(ReadError::NotFound),
                None => Err(ReadError::FallbackExhausted(err)),
            },
        };
        if matches!(result, Err(ReadError::NotFound)) {
            debug!("exercise {id} not found");
            return result;
        }
        log_on_error!(result, "get", "exercise")
    }

    async fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            fallback!(
                self,
                search_exercises(query),
                search_exercises(query),
                "exercises"
            ),
            "search",
            "exercises"
        )
    }

    async fn get_body_parts(&self) -> Result<Vec<String>, ReadError> {
        log_on_error!(
            fallback!(self, fetch_body_parts(), read_body_parts(), "body parts"),
            "get",
            "body parts"
        )
    }

    async fn get_targets(&self) -> Result<Vec<String>, ReadError> {
        log_on_error!(
            fallback!(self, fetch_targets(), read_targets(), "targets"),
            "get",
            "targets"
        )
    }

    async fn get_equipment(&self) -> Result<Vec<String>, ReadError> {
        log_on_error!(
            fallback!(self, fetch_equipment(), read_equipment(), "equipment"),
            "get",
            "equipment"
        )
    }

    async fn is_data_available(&self) -> Result<bool, ReadError> {
        Ok(self.get_exercise_count().await? > 0)
    }

    async fn get_last_sync(&self) -> Result<Option<DateTime<Utc>>, ReadError> {
        match self.local {
            Some(ref local) => local.read_last_sync().await,
            None => Ok(None),
        }
    }

    async fn get_exercise_count(&self) -> Result<usize, ReadError> {
        match self.local {
            Some(ref local) => local.count_exercises().await,
            None => Ok(0),
        }
    }
}
