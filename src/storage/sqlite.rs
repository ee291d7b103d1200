//! SQLite ledger implementation

use crate::state::{UnitStatus, UnitTally};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Ledger, StorageError, StorageResult};
use crate::storage::{DocumentTotals, RunRecord, RunStatus, UnitRecord};
use crate::TrawlError;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const UNIT_COLUMNS: &str = "date, region, case_category, status, links_found, documents_saved, \
     documents_failed, documents_skipped, pages_visited, updated_at";

/// SQLite ledger backend
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Opens or creates the ledger database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteLedger)` - Successfully opened/created database
    /// * `Err(TrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, TrawlError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, TrawlError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<UnitRecord> {
    let date: String = row.get(0)?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(UnitRecord {
        date,
        region: row.get(1)?,
        case_category: row.get(2)?,
        status: UnitStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(UnitStatus::Interrupted),
        tally: UnitTally {
            links_found: row.get(4)?,
            documents_saved: row.get(5)?,
            documents_failed: row.get(6)?,
            documents_skipped: row.get(7)?,
            pages_visited: row.get(8)?,
        },
        updated_at: row.get(9)?,
    })
}

impl Ledger for SqliteLedger {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Unit Outcomes =====

    fn record_unit(&mut self, run_id: i64, record: &UnitRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO units (run_id, date, region, case_category, status, links_found,
                documents_saved, documents_failed, documents_skipped, pages_visited, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(run_id, date, region) DO UPDATE SET
                case_category = excluded.case_category,
                status = excluded.status,
                links_found = excluded.links_found,
                documents_saved = excluded.documents_saved,
                documents_failed = excluded.documents_failed,
                documents_skipped = excluded.documents_skipped,
                pages_visited = excluded.pages_visited,
                updated_at = excluded.updated_at",
            params![
                run_id,
                record.date.format("%Y-%m-%d").to_string(),
                record.region,
                record.case_category,
                record.status.to_db_string(),
                record.tally.links_found,
                record.tally.documents_saved,
                record.tally.documents_failed,
                record.tally.documents_skipped,
                record.tally.pages_visited,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    fn units_for_run(&self, run_id: i64) -> StorageResult<Vec<UnitRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM units WHERE run_id = ?1 ORDER BY id",
            UNIT_COLUMNS
        ))?;
        let units = stmt
            .query_map(params![run_id], unit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    fn recent_units(&self, limit: usize) -> StorageResult<Vec<UnitRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM units ORDER BY updated_at DESC, id DESC LIMIT ?1",
            UNIT_COLUMNS
        ))?;
        let units = stmt
            .query_map(params![limit as i64], unit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    // ===== Statistics =====

    fn count_units_by_status(&self, status: UnitStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM units u
             WHERE u.id = (SELECT MAX(id) FROM units WHERE date = u.date AND region = u.region)
               AND u.status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn document_totals(&self) -> StorageResult<DocumentTotals> {
        let totals = self.conn.query_row(
            "SELECT COALESCE(SUM(links_found), 0), COALESCE(SUM(documents_saved), 0),
                    COALESCE(SUM(documents_failed), 0), COALESCE(SUM(documents_skipped), 0)
             FROM units",
            [],
            |row| {
                Ok(DocumentTotals {
                    links_found: row.get::<_, i64>(0)? as u64,
                    saved: row.get::<_, i64>(1)? as u64,
                    failed: row.get::<_, i64>(2)? as u64,
                    skipped: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;
        Ok(totals)
    }
}
