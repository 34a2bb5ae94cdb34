use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use tokio::sync::Mutex;

use crate::{CatalogSnapshot, Cursor, LocalCatalogRepository, RemoteCatalogRepository, SyncError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Clear the local catalog, then repopulate it page by page.
    Replace,
    /// Upsert every fetched page, then delete the exercises missing from the fetch. The local
    /// catalog never becomes emptier than before if the sync fails midway.
    #[default]
    Reconcile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub interval: Duration,
    pub page_size: u32,
    pub flush_threshold: usize,
    pub strategy: SyncStrategy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: Duration::hours(24),
            page_size: 50,
            flush_threshold: 200,
            strategy: SyncStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Keeps the local catalog in step with the remote catalog.
///
/// At most one sync runs at a time. Dropping a sync future cancels the sync at its next
/// suspension point; the snapshot is written last, so a cancelled or failed sync never updates
/// the time of the last sync.
pub struct CatalogSync<R, L> {
    remote: Arc<R>,
    local: Arc<L>,
    settings: SyncSettings,
    in_flight: Mutex<()>,
}

impl<R, L> CatalogSync<R, L>
where
    R: RemoteCatalogRepository,
    L: LocalCatalogRepository,
{
    pub fn new(remote: Arc<R>, local: Arc<L>, settings: SyncSettings) -> Self {
        Self {
            remote,
            local,
            settings: SyncSettings {
                page_size: settings.page_size.max(1),
                flush_threshold: settings.flush_threshold.max(1),
                ..settings
            },
            in_flight: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub async fn freshness(&self, now: DateTime<Utc>) -> Result<Freshness, SyncError> {
        if self.local.count_exercises().await? == 0 {
            return Ok(Freshness::Stale);
        }
        Ok(match self.local.read_last_sync().await? {
            Some(last_synced) if now - last_synced < self.settings.interval => Freshness::Fresh,
            _ => Freshness::Stale,
        })
    }

    /// Syncs if the local catalog is empty or the last sync is older than the sync interval.
    pub async fn sync_if_needed(&self) -> Result<Option<CatalogSnapshot>, SyncError> {
        let _guard = self.in_flight.lock().await;
        if self.freshness(Utc::now()).await? == Freshness::Fresh {
            debug!("exercise catalog is up to date");
            return Ok(None);
        }
        self.sync().await.map(Some)
    }

    pub async fn force_sync(&self) -> Result<CatalogSnapshot, SyncError> {
        let _guard = self.in_flight.lock().await;
        self.sync().await
    }

    async fn sync(&self) -> Result<CatalogSnapshot, SyncError> {
        let SyncSettings {
            page_size,
            flush_threshold,
            strategy,
            ..
        } = self.settings;

        info!("syncing exercise catalog ({strategy:?})");

        if strategy == SyncStrategy::Replace {
            self.local.clear_exercises().await?;
        }

        let mut fetched = HashSet::new();
        let mut buffer = Vec::with_capacity(flush_threshold);
        let mut cursor = Cursor::first(page_size);

        loop {
            let page = self.remote.fetch_exercises(Some(cursor)).await?;
            if page.is_empty() {
                break;
            }
            debug!(
                "fetched {} exercises at offset {}",
                page.len(),
                cursor.offset
            );
            fetched.extend(page.iter().map(|exercise| exercise.id.clone()));
            buffer.extend(page);
            if buffer.len() >= flush_threshold {
                self.local.upsert_exercises(&buffer).await?;
                buffer.clear();
            }
            cursor = cursor.next();
        }

        if !buffer.is_empty() {
            self.local.upsert_exercises(&buffer).await?;
        }

        if strategy == SyncStrategy::Reconcile {
            let removed = self.local.retain_exercises(&fetched).await?;
            if removed > 0 {
                info!("removed {removed} exercises missing from remote catalog");
            }
        }

        let snapshot = CatalogSnapshot {
            exercise_count: self.local.count_exercises().await?,
            last_synced: Utc::now(),
        };
        self.local.write_snapshot(&snapshot).await?;

        info!(
            "synced {} exercises ({} fetched)",
            snapshot.exercise_count,
            fetched.len()
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{
        StorageError,
        tests::{
            data::{EXERCISES, exercise, exercises},
            mock::{Local, Remote},
        },
    };

    use super::*;

    fn catalog_sync(
        remote: &Arc<Remote>,
        local: &Arc<Local>,
        strategy: SyncStrategy,
    ) -> CatalogSync<Remote, Local> {
        CatalogSync::new(
            Arc::clone(remote),
            Arc::clone(local),
            SyncSettings {
                strategy,
                ..SyncSettings::default()
            },
        )
    }

    #[rstest]
    #[tokio::test]
    async fn test_force_sync_paginates_until_empty_page(
        #[values(SyncStrategy::Replace, SyncStrategy::Reconcile)] strategy: SyncStrategy,
    ) {
        let remote = Arc::new(Remote::new(exercises(117)));
        let local = Arc::new(Local::default());

        let snapshot = catalog_sync(&remote, &local, strategy)
            .force_sync()
            .await
            .unwrap();

        assert_eq!(snapshot.exercise_count, 117);
        assert_eq!(
            remote.requests(),
            vec![
                Some(Cursor::new(50, 0)),
                Some(Cursor::new(50, 50)),
                Some(Cursor::new(50, 100)),
                Some(Cursor::new(50, 150)),
            ]
        );
        assert_eq!(remote.empty_pages(), 1);
        assert_eq!(local.upserted(), 117);
        assert_eq!(local.count_exercises().await.unwrap(), 117);
    }

    #[tokio::test]
    async fn test_force_sync_flushes_in_batches() {
        let remote = Arc::new(Remote::new(exercises(450)));
        let local = Arc::new(Local::default());

        catalog_sync(&remote, &local, SyncStrategy::Replace)
            .force_sync()
            .await
            .unwrap();

        assert_eq!(local.flushes(), vec![200, 200, 50]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_force_sync_idempotent(
        #[values(SyncStrategy::Replace, SyncStrategy::Reconcile)] strategy: SyncStrategy,
    ) {
        let remote = Arc::new(Remote::new(exercises(73)));
        let local = Arc::new(Local::default());
        let sync = catalog_sync(&remote, &local, strategy);

        sync.force_sync().await.unwrap();
        let first = local.ids();
        sync.force_sync().await.unwrap();

        assert_eq!(local.ids(), first);
        assert_eq!(first.len(), 73);
    }

    #[rstest]
    #[case::replace(SyncStrategy::Replace, 1)]
    #[case::reconcile(SyncStrategy::Reconcile, 0)]
    #[tokio::test]
    async fn test_force_sync_removes_exercises_missing_from_remote(
        #[case] strategy: SyncStrategy,
        #[case] clears: usize,
    ) {
        let remote = Arc::new(Remote::new(exercises(3)));
        let local = Arc::new(Local::with_exercises(&[exercise(999)]));

        catalog_sync(&remote, &local, strategy)
            .force_sync()
            .await
            .unwrap();

        assert_eq!(local.ids(), exercises(3).into_iter().map(|e| e.id).collect());
        assert_eq!(local.clears(), clears);
    }

    #[rstest]
    #[case::replace(SyncStrategy::Replace, 50)]
    #[case::reconcile(SyncStrategy::Reconcile, 55)]
    #[tokio::test]
    async fn test_force_sync_failure_keeps_snapshot(
        #[case] strategy: SyncStrategy,
        #[case] remaining: usize,
    ) {
        let remote = Arc::new(Remote::new(exercises(117)));
        remote.fail_at(50);
        let previous = CatalogSnapshot {
            exercise_count: 5,
            last_synced: Utc::now() - Duration::days(3),
        };
        let local = Arc::new(Local::with_exercises(&[
            exercise(1000),
            exercise(1001),
            exercise(1002),
            exercise(1003),
            exercise(1004),
        ]));
        local.write_snapshot(&previous).await.unwrap();
        let sync = CatalogSync::new(
            Arc::clone(&remote),
            Arc::clone(&local),
            SyncSettings {
                flush_threshold: 50,
                strategy,
                ..SyncSettings::default()
            },
        );

        assert!(matches!(
            sync.force_sync().await,
            Err(SyncError::Storage(StorageError::NoConnection))
        ));
        assert_eq!(local.read_snapshot().await.unwrap(), Some(previous));
        assert_eq!(local.count_exercises().await.unwrap(), remaining);
    }

    #[tokio::test]
    async fn test_force_sync_cancelled() {
        let remote = Arc::new(Remote::new(exercises(117)));
        remote.stall_at(100);
        let local = Arc::new(Local::default());
        let sync = catalog_sync(&remote, &local, SyncStrategy::Reconcile);

        assert!(
            tokio::time::timeout(StdDuration::from_millis(20), sync.force_sync())
                .await
                .is_err()
        );
        assert_eq!(local.read_snapshot().await.unwrap(), None);

        remote.stall_at(u32::MAX);
        assert_eq!(sync.force_sync().await.unwrap().exercise_count, 117);
    }

    #[rstest]
    #[case::stale(Duration::hours(24) + Duration::seconds(1), true)]
    #[case::exactly_interval(Duration::hours(24), true)]
    #[case::fresh(Duration::seconds(1), false)]
    #[case::future(-Duration::hours(1), false)]
    #[tokio::test]
    async fn test_sync_if_needed_by_age(#[case] age: Duration, #[case] expected: bool) {
        let remote = Arc::new(Remote::new(exercises(3)));
        let local = Arc::new(Local::with_exercises(&EXERCISES));
        local
            .write_snapshot(&CatalogSnapshot {
                exercise_count: EXERCISES.len(),
                last_synced: Utc::now() - age,
            })
            .await
            .unwrap();

        let result = catalog_sync(&remote, &local, SyncStrategy::Reconcile)
            .sync_if_needed()
            .await
            .unwrap();

        assert_eq!(result.is_some(), expected);
        assert_eq!(remote.requests().is_empty(), !expected);
    }

    #[tokio::test]
    async fn test_sync_if_needed_empty_store() {
        let remote = Arc::new(Remote::new(exercises(3)));
        let local = Arc::new(Local::default());
        local
            .write_snapshot(&CatalogSnapshot {
                exercise_count: 0,
                last_synced: Utc::now(),
            })
            .await
            .unwrap();
        let sync = catalog_sync(&remote, &local, SyncStrategy::Reconcile);

        assert_eq!(sync.freshness(Utc::now()).await.unwrap(), Freshness::Stale);
        assert_eq!(
            sync.sync_if_needed().await.unwrap().map(|s| s.exercise_count),
            Some(3)
        );
        assert_eq!(sync.freshness(Utc::now()).await.unwrap(), Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_sync_if_needed_missing_snapshot() {
        let remote = Arc::new(Remote::new(exercises(3)));
        let local = Arc::new(Local::with_exercises(&EXERCISES));
        let sync = catalog_sync(&remote, &local, SyncStrategy::Reconcile);

        assert_eq!(sync.freshness(Utc::now()).await.unwrap(), Freshness::Stale);
    }

    #[tokio::test]
    async fn test_sync_if_needed_single_flight() {
        let remote = Arc::new(Remote::new(exercises(3)));
        let local = Arc::new(Local::default());
        let sync = catalog_sync(&remote, &local, SyncStrategy::Reconcile);

        let (first, second) = tokio::join!(sync.sync_if_needed(), sync.sync_if_needed());

        assert!(first.unwrap().is_some());
        assert!(second.unwrap().is_none());
        assert_eq!(remote.empty_pages(), 1);
    }

    #[test]
    fn test_settings_bounds() {
        let sync = CatalogSync::new(
            Arc::new(Remote::default()),
            Arc::new(Local::default()),
            SyncSettings {
                page_size: 0,
                flush_threshold: 0,
                ..SyncSettings::default()
            },
        );
        assert_eq!(sync.settings().page_size, 1);
        assert_eq!(sync.settings().flush_threshold, 1);
    }
}
