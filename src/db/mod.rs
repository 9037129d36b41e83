pub mod pool;

use crate::errors::{AppError, AppResult};
use crate::models::{BoxRecord, PokemonRecord};
use chrono::{DateTime, Utc};
use pool::{open_connection, Pool, SqliteManager};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Result of a save: the new pokemon and whether its box had to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPokemon {
    pub pokemon: PokemonRecord,
    pub box_created: bool,
}

#[derive(Clone)]
pub struct Database {
    pool: Pool,
    db_path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("db_path", &self.db_path)
            .field("max_size", &self.pool.status().max_size)
            .finish()
    }
}

impl Database {
    /// Creates the schema if needed and builds a pool of at most `pool_size` connections.
    pub fn open(path: &Path, pool_size: usize) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }

        let conn = open_connection(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);

        let pool = Pool::builder(SqliteManager::new(path))
            .max_size(pool_size)
            .build()
            .map_err(|err| AppError::Internal(format!("connection pool: {err}")))?;

        Ok(Self {
            pool,
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `work` on a pooled connection off the async runtime. The connection
    /// goes back to the pool when the closure returns, errors or panics.
    async fn with_conn<T, F>(&self, work: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut conn = self.pool.get().await?;
        tokio::task::spawn_blocking(move || work(&mut conn)).await?
    }

    pub async fn save_pokemon(&self, box_id: i64, name: String) -> AppResult<SavedPokemon> {
        self.with_conn(move |conn| save_pokemon(conn, box_id, &name)).await
    }

    pub async fn find_box(&self, box_id: i64) -> AppResult<Option<BoxRecord>> {
        self.with_conn(move |conn| find_first_box(conn, box_id)).await
    }

    pub async fn count_boxes(&self) -> AppResult<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM boxes", [], |row| row.get(0))
                .map_err(AppError::from)
        })
        .await
    }

    pub async fn list_pokemon_in_box(&self, box_id: i64) -> AppResult<Vec<PokemonRecord>> {
        self.with_conn(move |conn| list_pokemon_in_box(conn, box_id)).await
    }
}

/// Finds or creates the box, then creates the pokemon, all in one
/// immediate transaction. Box creation is an upsert on the primary key, so
/// concurrent saves against the same new id still yield a single box.
pub fn save_pokemon(conn: &mut Connection, box_id: i64, name: &str) -> AppResult<SavedPokemon> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (parent, box_created) = match find_first_box(&tx, box_id)? {
        Some(existing) => (existing, false),
        None => {
            let inserted = insert_box_if_absent(&tx, box_id)?;
            let created = find_first_box(&tx, box_id)?
                .ok_or_else(|| AppError::Internal(format!("box {box_id} missing after insert")))?;
            (created, inserted)
        }
    };

    let pokemon = insert_pokemon(&tx, parent.id, name)?;
    tx.commit()?;

    Ok(SavedPokemon { pokemon, box_created })
}

pub fn find_first_box(conn: &Connection, box_id: i64) -> AppResult<Option<BoxRecord>> {
    conn.query_row(
        "SELECT id, created_at FROM boxes WHERE id = ?1 LIMIT 1",
        [box_id],
        parse_box_row,
    )
    .optional()
    .map_err(AppError::from)
}

/// Returns `true` when this call created the row.
fn insert_box_if_absent(conn: &Connection, box_id: i64) -> AppResult<bool> {
    let changed = conn.execute(
        "INSERT INTO boxes (id, created_at) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
        params![box_id, Utc::now().to_rfc3339()],
    )?;
    Ok(changed == 1)
}

fn insert_pokemon(conn: &Connection, box_id: i64, name: &str) -> AppResult<PokemonRecord> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO pokemon (name, box_id, created_at) VALUES (?1, ?2, ?3)",
        params![name, box_id, created_at.to_rfc3339()],
    )?;

    Ok(PokemonRecord {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        box_id,
        created_at,
    })
}

pub fn list_pokemon_in_box(conn: &Connection, box_id: i64) -> AppResult<Vec<PokemonRecord>> {
    let mut statement = conn.prepare(
        "SELECT id, name, box_id, created_at FROM pokemon WHERE box_id = ?1 ORDER BY id ASC",
    )?;
    let rows = statement
        .query_map([box_id], parse_pokemon_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn parse_box_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BoxRecord> {
    Ok(BoxRecord {
        id: row.get(0)?,
        created_at: parse_time(&row.get::<_, String>(1)?)?,
    })
}

fn parse_pokemon_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PokemonRecord> {
    Ok(PokemonRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        box_id: row.get(2)?,
        created_at: parse_time(&row.get::<_, String>(3)?)?,
    })
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}
