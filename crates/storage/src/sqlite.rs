//! SQLite
//!
//! `SQLite` keeps the on-device mirror of the exercise catalog and the snapshot of the last
//! completed sync. Statements run on the blocking thread pool. Writes are serialized by the
//! connection lock and each write is committed before it returns.

use std::{
    collections::HashSet,
    path::Path,
    sync::{Arc, Mutex},
};

use fittrack_domain as domain;
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::Type};

/// Schema migrations, applied in order. The index of a migration plus one is the schema version
/// it produces.
const MIGRATIONS: &[&str] = &[r"
    CREATE TABLE exercises (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        body_part TEXT NOT NULL,
        target TEXT NOT NULL,
        equipment TEXT NOT NULL,
        secondary_muscles TEXT NOT NULL DEFAULT '[]',
        instructions TEXT NOT NULL DEFAULT '[]',
        description TEXT NOT NULL DEFAULT '',
        difficulty TEXT NOT NULL,
        category TEXT NOT NULL
    );
    CREATE INDEX idx_exercises_name ON exercises(name);
    CREATE INDEX idx_exercises_body_part ON exercises(body_part);
    CREATE INDEX idx_exercises_target ON exercises(target);
    CREATE INDEX idx_exercises_equipment ON exercises(equipment);

    CREATE TABLE catalog_snapshot (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        exercise_count INTEGER NOT NULL,
        last_synced TEXT NOT NULL
    );
"];

const COLUMNS: &str = "id, name, body_part, target, equipment, secondary_muscles, instructions, \
                       description, difficulty, category";

#[derive(Clone)]
pub struct SQLite {
    connection: Arc<Mutex<Connection>>,
}

impl SQLite {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, domain::StorageError> {
        let path = path.as_ref();
        info!("opening exercise database at {}", path.display());
        let connection = Connection::open(path).map_err(storage_error)?;
        connection
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(storage_error)?;
        Self::init(connection)
    }

    pub fn open_in_memory() -> Result<Self, domain::StorageError> {
        debug!("opening in-memory exercise database");
        Self::init(Connection::open_in_memory().map_err(storage_error)?)
    }

    fn init(mut connection: Connection) -> Result<Self, domain::StorageError> {
        migrate(&mut connection).map_err(storage_error)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T, domain::StorageError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut connection = connection
                .lock()
                .map_err(|_| domain::StorageError::Other("database connection poisoned".into()))?;
            f(&mut connection).map_err(storage_error)
        })
        .await
        .map_err(|err| domain::StorageError::Other(Box::new(err)))?
    }

    async fn select_exercises(
        &self,
        filter: Option<(&'static str, String)>,
    ) -> Result<Vec<domain::Exercise>, domain::StorageError> {
        self.run(move |connection| {
            let sql = match filter {
                Some((column, _)) => {
                    format!("SELECT {COLUMNS} FROM exercises WHERE {column} = ?1 ORDER BY name, id")
                }
                None => format!("SELECT {COLUMNS} FROM exercises ORDER BY name, id"),
            };
            let mut statement = connection.prepare_cached(&sql)?;
            let rows = statement.query_map(
                params_from_iter(filter.iter().map(|(_, value)| value)),
                exercise_from_row,
            )?;
            rows.collect()
        })
        .await
    }

    async fn select_distinct(
        &self,
        column: &'static str,
    ) -> Result<Vec<String>, domain::StorageError> {
        self.run(move |connection| {
            let mut statement = connection.prepare_cached(&format!(
                "SELECT DISTINCT {column} FROM exercises ORDER BY {column}"
            ))?;
            let rows = statement.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
    }
}

fn migrate(connection: &mut Connection) -> rusqlite::Result<()> {
    let version: usize = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > MIGRATIONS.len() {
        warn!(
            "database schema version {version} is newer than supported version {}",
            MIGRATIONS.len()
        );
        return Ok(());
    }
    if version == MIGRATIONS.len() {
        return Ok(());
    }
    let transaction = connection.transaction()?;
    for (index, migration) in MIGRATIONS.iter().enumerate().skip(version) {
        info!("migrating database schema to version {}", index + 1);
        transaction.execute_batch(migration)?;
    }
    transaction.pragma_update(None, "user_version", MIGRATIONS.len())?;
    transaction.commit()
}

fn storage_error(err: rusqlite::Error) -> domain::StorageError {
    domain::StorageError::Other(Box::new(err))
}

fn exercise_from_row(row: &Row) -> rusqlite::Result<domain::Exercise> {
    Ok(domain::Exercise {
        id: row.get::<_, String>(0)?.into(),
        name: row.get(1)?,
        body_part: domain::BodyPart::from_name(&row.get::<_, String>(2)?),
        target: row.get(3)?,
        equipment: row.get(4)?,
        secondary_muscles: list_from_row(row, 5)?,
        instructions: list_from_row(row, 6)?,
        description: row.get(7)?,
        difficulty: domain::Difficulty::from_name(&row.get::<_, String>(8)?),
        category: domain::Category::from_name(&row.get::<_, String>(9)?),
    })
}

fn list_from_row(row: &Row, index: usize) -> rusqlite::Result<Vec<String>> {
    let value: String = row.get(index)?;
    serde_json::from_str(&value)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

fn list_to_sql(list: &[String]) -> rusqlite::Result<String> {
    serde_json::to_string(list).map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

impl domain::LocalCatalogRepository for SQLite {
    async fn read_exercises(&self) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        Ok(self.select_exercises(None).await?)
    }

    async fn read_exercises_by_body_part(
        &self,
        body_part: &str,
    ) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        Ok(self
            .select_exercises(Some(("body_part", body_part.to_string())))
            .await?)
    }

    async fn read_exercises_by_target(
        &self,
        target: &str,
    ) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        Ok(self
            .select_exercises(Some(("target", target.to_string())))
            .await?)
    }

    async fn read_exercises_by_equipment(
        &self,
        equipment: &str,
    ) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        Ok(self
            .select_exercises(Some(("equipment", equipment.to_string())))
            .await?)
    }

    async fn read_exercise(
        &self,
        id: &domain::ExerciseID,
    ) -> Result<Option<domain::Exercise>, domain::ReadError> {
        let id = id.to_string();
        Ok(self
            .run(move |connection| {
                connection
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM exercises WHERE id = ?1"),
                        [&id],
                        exercise_from_row,
                    )
                    .optional()
            })
            .await?)
    }

    // SQLite's case folding is limited to ASCII, so the match is done here.
    async fn search_exercises(
        &self,
        query: &str,
    ) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        Ok(self
            .select_exercises(None)
            .await?
            .into_iter()
            .filter(|exercise| exercise.matches(query))
            .collect())
    }

    async fn read_body_parts(&self) -> Result<Vec<String>, domain::ReadError> {
        Ok(self.select_distinct("body_part").await?)
    }

    async fn read_targets(&self) -> Result<Vec<String>, domain::ReadError> {
        Ok(self.select_distinct("target").await?)
    }

    async fn read_equipment(&self) -> Result<Vec<String>, domain::ReadError> {
        Ok(self.select_distinct("equipment").await?)
    }

    async fn count_exercises(&self) -> Result<usize, domain::ReadError> {
        Ok(self
            .run(|connection| {
                connection.query_row("SELECT COUNT(*) FROM exercises", [], |row| row.get(0))
            })
            .await?)
    }

    async fn read_snapshot(&self) -> Result<Option<domain::CatalogSnapshot>, domain::ReadError> {
        Ok(self
            .run(|connection| {
                connection
                    .query_row(
                        "SELECT exercise_count, last_synced FROM catalog_snapshot WHERE id = 1",
                        [],
                        |row| {
                            Ok(domain::CatalogSnapshot {
                                exercise_count: row.get(0)?,
                                last_synced: row.get(1)?,
                            })
                        },
                    )
                    .optional()
            })
            .await?)
    }

    async fn upsert_exercises(
        &self,
        exercises: &[domain::Exercise],
    ) -> Result<(), domain::WriteError> {
        let exercises = exercises.to_vec();
        debug!("upserting {} exercises", exercises.len());
        Ok(self
            .run(move |connection| {
                let transaction = connection.transaction()?;
                {
                    let mut statement = transaction.prepare_cached(&format!(
                        "INSERT INTO exercises ({COLUMNS}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                         ON CONFLICT(id) DO UPDATE SET \
                         name = excluded.name, \
                         body_part = excluded.body_part, \
                         target = excluded.target, \
                         equipment = excluded.equipment, \
                         secondary_muscles = excluded.secondary_muscles, \
                         instructions = excluded.instructions, \
                         description = excluded.description, \
                         difficulty = excluded.difficulty, \
                         category = excluded.category"
                    ))?;
                    for exercise in &exercises {
                        statement.execute(params![
                            exercise.id.as_str(),
                            exercise.name,
                            exercise.body_part.to_string(),
                            exercise.target,
                            exercise.equipment,
                            list_to_sql(&exercise.secondary_muscles)?,
                            list_to_sql(&exercise.instructions)?,
                            exercise.description,
                            exercise.difficulty.to_string(),
                            exercise.category.to_string(),
                        ])?;
                    }
                }
                transaction.commit()
            })
            .await?)
    }

    async fn retain_exercises(
        &self,
        ids: &HashSet<domain::ExerciseID>,
    ) -> Result<usize, domain::WriteError> {
        let ids = ids.iter().map(ToString::to_string).collect::<HashSet<_>>();
        Ok(self
            .run(move |connection| {
                let transaction = connection.transaction()?;
                let stored = {
                    let mut statement = transaction.prepare("SELECT id FROM exercises")?;
                    let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                };
                let mut removed = 0;
                {
                    let mut statement =
                        transaction.prepare_cached("DELETE FROM exercises WHERE id = ?1")?;
                    for id in stored.iter().filter(|id| !ids.contains(*id)) {
                        removed += statement.execute([id])?;
                    }
                }
                transaction.commit()?;
                Ok(removed)
            })
            .await?)
    }

    async fn clear_exercises(&self) -> Result<(), domain::WriteError> {
        Ok(self
            .run(|connection| {
                connection.execute("DELETE FROM exercises", [])?;
                Ok(())
            })
            .await?)
    }

    async fn write_snapshot(
        &self,
        snapshot: &domain::CatalogSnapshot,
    ) -> Result<(), domain::WriteError> {
        let snapshot = *snapshot;
        Ok(self
            .run(move |connection| {
                connection.execute(
                    "INSERT INTO catalog_snapshot (id, exercise_count, last_synced) \
                     VALUES (1, ?1, ?2) \
                     ON CONFLICT(id) DO UPDATE SET \
                     exercise_count = excluded.exercise_count, \
                     last_synced = excluded.last_synced",
                    params![snapshot.exercise_count, snapshot.last_synced],
                )?;
                Ok(())
            })
            .await?)
    }
}
