//! Database module - SQLite storage for exercise records

use std::path::Path;

use chrono::{DateTime, Duration, Local, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use tracing::debug;

use crate::exercise::{Exercise, match_key};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Количество дней должно быть положительным, получено {0}")]
    InvalidWindow(i64),
    #[error("Повреждённая запись #{id}: {reason}")]
    CorruptRow { id: i64, reason: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const COLUMNS: &str = "id, name, weight, reps, sets, note, created_at";

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Self::from_connection(Connection::open(path)?)?;
        debug!("Opened database at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.create_scalar_function(
            "match_key",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let name: String = ctx.get(0)?;
                Ok(match_key(&name))
            },
        )?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create table and indexes if missing. Safe to call any number of times.
    pub fn initialize(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                weight REAL NOT NULL CHECK (weight >= 0),
                reps INTEGER NOT NULL CHECK (reps >= 1),
                sets INTEGER NOT NULL CHECK (sets >= 1),
                note TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_exercises_name
                ON exercises (name);
            CREATE INDEX IF NOT EXISTS idx_exercises_created_at
                ON exercises (created_at);
            CREATE INDEX IF NOT EXISTS idx_exercises_name_created_at
                ON exercises (name, created_at);",
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Insert a record and return the assigned id. Any id on the record is ignored.
    pub fn add(&self, exercise: &Exercise) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO exercises (name, weight, reps, sets, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                exercise.name().trim(),
                exercise.weight(),
                exercise.reps(),
                exercise.sets(),
                exercise.note(),
                encode_time(exercise.created_at()),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        debug!(id, name = exercise.name(), "exercise added");
        Ok(id)
    }

    /// Records created since local midnight, oldest first
    pub fn todays_records(&self) -> Result<Vec<Exercise>> {
        self.select_many(
            &format!(
                "SELECT {COLUMNS} FROM exercises
                 WHERE created_at >= ?1
                 ORDER BY created_at ASC"
            ),
            &[&encode_time(local_midnight())],
        )
    }

    /// Heaviest record for the exercise; ties go to the earliest one
    pub fn max_weight(&self, name: &str) -> Result<Option<Exercise>> {
        self.select_one(
            &format!(
                "SELECT {COLUMNS} FROM exercises
                 WHERE match_key(name) = ?1
                 ORDER BY weight DESC, created_at ASC
                 LIMIT 1"
            ),
            &[&match_key(name)],
        )
    }

    /// Most recent record for the exercise
    pub fn last_record(&self, name: &str) -> Result<Option<Exercise>> {
        self.select_one(
            &format!(
                "SELECT {COLUMNS} FROM exercises
                 WHERE match_key(name) = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1"
            ),
            &[&match_key(name)],
        )
    }

    /// Records for the exercise within the last `days` days, oldest first
    pub fn history(&self, name: &str, days: i64) -> Result<Vec<Exercise>> {
        if days <= 0 {
            return Err(StoreError::InvalidWindow(days));
        }
        let key = match_key(name);
        // A window reaching past the earliest representable time covers everything
        match Duration::try_days(days).and_then(|window| Utc::now().checked_sub_signed(window)) {
            Some(since) => self.select_many(
                &format!(
                    "SELECT {COLUMNS} FROM exercises
                     WHERE match_key(name) = ?1 AND created_at >= ?2
                     ORDER BY created_at ASC"
                ),
                &[&key, &encode_time(since)],
            ),
            None => self.select_many(
                &format!(
                    "SELECT {COLUMNS} FROM exercises
                     WHERE match_key(name) = ?1
                     ORDER BY created_at ASC"
                ),
                &[&key],
            ),
        }
    }

    /// Remove a record. Returns false when no such id exists.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM exercises WHERE id = ?1", [id])?;
        tx.commit()?;
        debug!(id, removed, "delete");
        Ok(removed > 0)
    }

    /// Distinct stored names, alphabetical
    pub fn all_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT name FROM exercises ORDER BY name ASC")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM exercises", [], |row| row.get(0))?)
    }

    /// Close the connection, reporting any error
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    fn select_many(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRow::into_exercise).collect()
    }

    fn select_one(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Option<Exercise>> {
        let raw = self.conn.query_row(sql, args, read_row).optional()?;
        raw.map(RawRow::into_exercise).transpose()
    }
}

/// Row as stored, before the record invariants are re-checked
struct RawRow {
    id: i64,
    name: String,
    weight: f64,
    reps: i32,
    sets: i32,
    note: Option<String>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        name: row.get(1)?,
        weight: row.get(2)?,
        reps: row.get(3)?,
        sets: row.get(4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl RawRow {
    fn into_exercise(self) -> Result<Exercise> {
        let id = self.id;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| StoreError::CorruptRow {
                id,
                reason: format!("created_at '{}': {}", self.created_at, e),
            })?;
        let exercise = Exercise::new(
            self.name,
            self.weight,
            self.reps,
            self.sets,
            self.note,
            created_at,
        )
        .map_err(|e| StoreError::CorruptRow {
            id,
            reason: e.to_string(),
        })?;
        Ok(exercise.with_id(id))
    }
}

/// Fixed-width UTC form so text order matches time order
fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn local_midnight() -> DateTime<Utc> {
    Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|d| d.with_timezone(&Utc))
        // No local midnight (DST gap): fall back to 24h ago
        .unwrap_or_else(|| Utc::now() - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(name: &str, weight: f64, created_at: DateTime<Utc>) -> Exercise {
        Exercise::new(name, weight, 8, 3, None, created_at).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days)
    }

    #[test]
    fn test_initialize_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_add_assigns_ids_without_dedup() {
        let db = Database::open_in_memory().unwrap();
        let ex = record("жим", 80.0, Utc::now());
        let a = db.add(&ex).unwrap();
        let b = db.add(&ex).unwrap();
        assert_ne!(a, b);
        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn test_add_ignores_caller_id() {
        let db = Database::open_in_memory().unwrap();
        let ex = record("жим", 80.0, Utc::now()).with_id(999);
        let id = db.add(&ex).unwrap();
        assert_ne!(id, 999);
    }

    #[test]
    fn test_empty_store() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.todays_records().unwrap().is_empty());
        assert!(db.max_weight("anything").unwrap().is_none());
        assert!(db.last_record("anything").unwrap().is_none());
        assert!(db.all_names().unwrap().is_empty());
    }

    #[test]
    fn test_todays_records_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.add(&record("присед", 100.0, now)).unwrap();
        db.add(&record("жим", 80.0, days_ago(2))).unwrap();
        db.add(&record("тяга", 120.0, now - Duration::seconds(1)))
            .unwrap();

        let today = db.todays_records().unwrap();
        let names: Vec<_> = today.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["тяга", "присед"]);
        assert!(today.iter().all(|e| e.id().is_some()));
    }

    #[test]
    fn test_max_weight() {
        let db = Database::open_in_memory().unwrap();
        let d60 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let d80 = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        let d70 = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        db.add(&record("жим", 60.0, d60)).unwrap();
        db.add(&record("жим", 80.0, d80)).unwrap();
        db.add(&record("жим", 70.0, d70)).unwrap();

        let best = db.max_weight("жим").unwrap().unwrap();
        assert_eq!(best.weight(), 80.0);
        assert_eq!(best.created_at(), d80);
    }

    #[test]
    fn test_max_weight_tie_goes_to_earliest() {
        let db = Database::open_in_memory().unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        db.add(&record("жим", 80.0, later)).unwrap();
        db.add(&record("жим", 80.0, earlier)).unwrap();

        let best = db.max_weight("жим").unwrap().unwrap();
        assert_eq!(best.created_at(), earlier);
    }

    #[test]
    fn test_name_matching_folds_case_and_yo() {
        let db = Database::open_in_memory().unwrap();
        db.add(&record("Жим лёжа", 90.0, days_ago(1))).unwrap();
        db.add(&record("жим стоя", 50.0, days_ago(1))).unwrap();

        for query in ["жим лежа", "ЖИМ ЛЁЖА", "  Жим Лежа "] {
            let best = db.max_weight(query).unwrap().unwrap();
            assert_eq!(best.weight(), 90.0, "query: {query}");
            assert_eq!(best.name(), "Жим лёжа");
        }
        assert_eq!(db.history("жим лежа", 7).unwrap().len(), 1);
        assert!(db.last_record("ЖИМ ЛЁЖА").unwrap().is_some());
        assert!(db.max_weight("жим").unwrap().is_none());
    }

    #[test]
    fn test_last_record() {
        let db = Database::open_in_memory().unwrap();
        db.add(&record("присед", 100.0, days_ago(3))).unwrap();
        db.add(&record("присед", 90.0, days_ago(1))).unwrap();
        db.add(&record("присед", 110.0, days_ago(5))).unwrap();

        let last = db.last_record("присед").unwrap().unwrap();
        assert_eq!(last.weight(), 90.0);
    }

    #[test]
    fn test_history_window() {
        let db = Database::open_in_memory().unwrap();
        db.add(&record("жим", 70.0, days_ago(100))).unwrap();
        db.add(&record("жим", 80.0, days_ago(10))).unwrap();
        db.add(&record("жим", 75.0, days_ago(30))).unwrap();

        let history = db.history("жим", 90).unwrap();
        let weights: Vec<_> = history.iter().map(|e| e.weight()).collect();
        assert_eq!(weights, vec![75.0, 80.0]);
    }

    #[test]
    fn test_history_rejects_non_positive_window() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.history("жим", 0), Err(StoreError::InvalidWindow(0))));
        assert!(matches!(db.history("жим", -5), Err(StoreError::InvalidWindow(-5))));
    }

    #[test]
    fn test_history_huge_window_returns_everything() {
        let db = Database::open_in_memory().unwrap();
        db.add(&record("жим", 60.0, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap()))
            .unwrap();
        db.add(&record("жим", 80.0, days_ago(1))).unwrap();
        db.add(&record("присед", 100.0, days_ago(1))).unwrap();

        for days in [1_000_000_000, i64::MAX] {
            let weights: Vec<_> = db
                .history("жим", days)
                .unwrap()
                .iter()
                .map(|e| e.weight())
                .collect();
            assert_eq!(weights, vec![60.0, 80.0], "days: {days}");
        }
    }

    #[test]
    fn test_failed_add_leaves_store_unchanged() {
        let db = Database::open_in_memory().unwrap();
        db.add(&record("жим", 80.0, Utc::now())).unwrap();

        let bad = record("жим", 80.0, Utc::now()).with_weight_unchecked(-5.0);
        assert!(matches!(db.add(&bad), Err(StoreError::Sqlite(_))));
        assert_eq!(db.count().unwrap(), 1);

        // No transaction is left open after the failure
        db.add(&record("присед", 100.0, Utc::now())).unwrap();
        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        let id = db.add(&record("жим", 80.0, Utc::now())).unwrap();
        assert!(db.delete(id).unwrap());
        assert!(!db.delete(id).unwrap());
        assert!(!db.delete(12345).unwrap());
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_all_names_distinct_sorted() {
        let db = Database::open_in_memory().unwrap();
        for name in ["тяга", "жим", "присед", "жим"] {
            db.add(&record(name, 50.0, Utc::now())).unwrap();
        }
        assert_eq!(db.all_names().unwrap(), vec!["жим", "присед", "тяга"]);
    }

    #[test]
    fn test_round_trip_fields() {
        let db = Database::open_in_memory().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let ex = Exercise::new("  становая ", 142.5, 5, 3, Some("пояс".into()), at).unwrap();
        let id = db.add(&ex).unwrap();

        let stored = db.last_record("становая").unwrap().unwrap();
        assert_eq!(stored.id(), Some(id));
        assert_eq!(stored.name(), "становая");
        assert_eq!(stored.weight(), 142.5);
        assert_eq!(stored.note(), Some("пояс"));
        assert_eq!(stored.created_at(), at);
    }

    #[test]
    fn test_check_constraints() {
        let db = Database::open_in_memory().unwrap();
        let err = db.conn.execute(
            "INSERT INTO exercises (name, weight, reps, sets, created_at) VALUES ('x', -1, 1, 1, 'now')",
            [],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_reopen_file_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gym.db");

        let db = Database::open(&path).unwrap();
        db.add(&record("жим", 80.0, Utc::now())).unwrap();
        db.close().unwrap();

        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.all_names().unwrap(), vec!["жим"]);
    }
}
