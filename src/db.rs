// 🗄️ SQLite Record Store - component source, master registry, aliases, results
//
// Table names come from configuration and are validated as identifiers.
// Every value goes through a bound parameter.

use crate::config::TableNames;
use crate::recommend::{
    parse_ranked, Correctness, MatchResult, Recommendation, RecommendationPolicy,
};
use crate::record::{
    AliasRow, ComponentRecord, ComponentRow, MasterCandidate, StandardName, MASTER_COLUMNS,
};
use crate::store::{RecordStore, StoreError, StoreResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Check that a configured table name is a plain SQL identifier
pub fn validate_identifier(name: &str) -> StoreResult<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

fn validate_tables(tables: &TableNames) -> StoreResult<()> {
    for name in [&tables.component, &tables.master, &tables.aliases, &tables.results] {
        validate_identifier(name)?;
    }
    Ok(())
}

pub fn setup_database(conn: &Connection, tables: &TableNames) -> StoreResult<()> {
    validate_tables(tables)?;

    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Component source
    // ==========================================================================
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                LINE_NUM INTEGER NOT NULL,
                LNAME TEXT,
                FNAME TEXT,
                MNAME TEXT,
                M2NAME TEXT,
                NB INTEGER,
                ID INTEGER
            )",
            tables.component
        ),
        [],
    )?;

    // ==========================================================================
    // Master registry
    // ==========================================================================
    let master_columns: Vec<String> = MASTER_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| match i {
            0 | 1 => format!("{} INTEGER NOT NULL", col),
            2..=5 => format!("{} TEXT", col),
            _ => format!("{} INTEGER", col),
        })
        .collect();
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            tables.master,
            master_columns.join(", ")
        ),
        [],
    )?;

    // ==========================================================================
    // Name aliases
    // ==========================================================================
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                NonStandardName TEXT NOT NULL,
                StandardName TEXT NOT NULL,
                Appearances INTEGER NOT NULL DEFAULT 0
            )",
            tables.aliases
        ),
        [],
    )?;

    // ==========================================================================
    // Results (one row per record per run)
    // ==========================================================================
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                line_num INTEGER NOT NULL,
                recommendation TEXT NOT NULL,
                fitness REAL,
                ground_truth INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                matches TEXT,
                policy TEXT NOT NULL,
                run_id TEXT NOT NULL,
                processed_at TEXT NOT NULL,
                PRIMARY KEY (run_id, line_num)
            )",
            tables.results
        ),
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{0}_line\" ON \"{0}\"(LINE_NUM)",
            tables.component
        ),
        [],
    )?;

    conn.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{0}_names\" ON \"{0}\"(smfname COLLATE NOCASE, mlname COLLATE NOCASE)",
            tables.master
        ),
        [],
    )?;

    conn.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{0}_raw\" ON \"{0}\"(NonStandardName)",
            tables.aliases
        ),
        [],
    )?;

    Ok(())
}

/// Read every row of a CSV file into `T`
pub fn load_csv<T: DeserializeOwned>(csv_path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {:?}", csv_path))?;

    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("Failed to deserialize row {}", i + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

// ============================================================================
// STORED RESULT
// ============================================================================

/// A result row as persisted, with its run metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub result: MatchResult,
    pub run_id: String,
    pub processed_at: DateTime<Utc>,
}

/// Flat CSV layout of the results table
#[derive(Debug, Serialize, Deserialize)]
struct ResultCsvRow {
    line_num: i64,
    recommendation: String,
    fitness: Option<f64>,
    ground_truth: i64,
    correct: i64,
    matches: Option<String>,
    policy: String,
    run_id: String,
    processed_at: String,
}

fn decode_error(what: &str, reason: impl ToString) -> StoreError {
    StoreError::Decode {
        what: what.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
    tables: TableNames,
    observation_year: i32,
    run_id: String,
}

impl SqliteStore {
    pub fn open(path: &Path, tables: TableNames, observation_year: i32) -> StoreResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_connection(conn, tables, observation_year)
    }

    pub fn from_connection(
        conn: Connection,
        tables: TableNames,
        observation_year: i32,
    ) -> StoreResult<Self> {
        setup_database(&conn, &tables)?;
        Ok(SqliteStore {
            conn,
            tables,
            observation_year,
            run_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Identifier written with every result appended through this handle
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========================================================================
    // IMPORT
    // ========================================================================

    pub fn insert_components(&mut self, rows: &[ComponentRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (LINE_NUM, LNAME, FNAME, MNAME, M2NAME, NB, ID)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                self.tables.component
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.line_num, row.lname, row.fname, row.mname, row.m2name, row.nb, row.id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn insert_master(&mut self, rows: &[MasterCandidate]) -> Result<usize> {
        let placeholders: Vec<String> =
            (1..=MASTER_COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.tables.master,
            MASTER_COLUMNS.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.column_values()))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn insert_aliases(&mut self, rows: &[AliasRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (NonStandardName, StandardName, Appearances)
                 VALUES (?1, ?2, ?3)",
                self.tables.aliases
            ))?;
            for row in rows {
                stmt.execute(params![row.non_standard_name, row.standard_name, row.appearances])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn import_components(&mut self, csv_path: &Path) -> Result<usize> {
        let rows: Vec<ComponentRow> = load_csv(csv_path).context("Failed to load components")?;
        self.insert_components(&rows)
    }

    pub fn import_master(&mut self, csv_path: &Path) -> Result<usize> {
        let rows: Vec<MasterCandidate> = load_csv(csv_path).context("Failed to load master")?;
        self.insert_master(&rows)
    }

    pub fn import_aliases(&mut self, csv_path: &Path) -> Result<usize> {
        let rows: Vec<AliasRow> = load_csv(csv_path).context("Failed to load aliases")?;
        self.insert_aliases(&rows)
    }

    // ========================================================================
    // RESULTS
    // ========================================================================

    /// Results of one run, or of every run when `run_id` is `None`
    pub fn load_results(&self, run_id: Option<&str>) -> StoreResult<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT line_num, recommendation, fitness, ground_truth, correct, matches,
                    policy, run_id, processed_at
             FROM \"{}\"
             WHERE ?1 IS NULL OR run_id = ?1
             ORDER BY processed_at, line_num",
            self.tables.results
        ))?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(ResultCsvRow {
                    line_num: row.get(0)?,
                    recommendation: row.get(1)?,
                    fitness: row.get(2)?,
                    ground_truth: row.get(3)?,
                    correct: row.get(4)?,
                    matches: row.get(5)?,
                    policy: row.get(6)?,
                    run_id: row.get(7)?,
                    processed_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::decode_result).collect()
    }

    fn decode_result(row: ResultCsvRow) -> StoreResult<StoredResult> {
        let recommendation = Recommendation::parse(&row.recommendation)
            .ok_or_else(|| decode_error("recommendation", &row.recommendation))?;
        let correct = Correctness::from_code(row.correct)
            .ok_or_else(|| decode_error("correct", row.correct))?;
        let policy = RecommendationPolicy::parse(&row.policy)
            .ok_or_else(|| decode_error("policy", &row.policy))?;
        let ranked = match &row.matches {
            Some(s) => Some(parse_ranked(s).ok_or_else(|| decode_error("matches", s))?),
            None => None,
        };
        let processed_at = DateTime::parse_from_rfc3339(&row.processed_at)
            .map_err(|e| decode_error("processed_at", e))?
            .with_timezone(&Utc);

        Ok(StoredResult {
            result: MatchResult {
                line_num: row.line_num,
                recommendation,
                fitness: row.fitness,
                ground_truth: row.ground_truth,
                correct,
                ranked,
                policy,
            },
            run_id: row.run_id,
            processed_at,
        })
    }

    pub fn export_results_csv(&self, csv_path: &Path, run_id: Option<&str>) -> Result<usize> {
        let results = self.load_results(run_id)?;
        let mut wtr = csv::Writer::from_path(csv_path)
            .with_context(|| format!("Failed to create CSV file {:?}", csv_path))?;

        for stored in &results {
            let r = &stored.result;
            wtr.serialize(ResultCsvRow {
                line_num: r.line_num,
                recommendation: r.recommendation.to_string(),
                fitness: r.fitness,
                ground_truth: r.ground_truth,
                correct: r.correct.code(),
                matches: r.ranked_string(),
                policy: r.policy.as_str().to_string(),
                run_id: stored.run_id.clone(),
                processed_at: stored.processed_at.to_rfc3339(),
            })?;
        }
        wtr.flush()?;

        Ok(results.len())
    }

    fn find_candidates(&self, other_column: &str, first: &str, other: &str) -> StoreResult<Vec<MasterCandidate>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM \"{}\"
             WHERE smfname = ?1 COLLATE NOCASE AND {} = ?2 COLLATE NOCASE
             ORDER BY id, casen",
            MASTER_COLUMNS.join(", "),
            self.tables.master,
            other_column
        ))?;

        let candidates = stmt
            .query_map(params![first, other], |row| MasterCandidate::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(first, other_column, other, found = candidates.len(), "candidate query");
        Ok(candidates)
    }
}

impl RecordStore for SqliteStore {
    fn lookup_component(&self, line_num: i64) -> StoreResult<Option<ComponentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT LNAME, FNAME, MNAME, M2NAME, NB, ID FROM \"{}\" WHERE LINE_NUM = ?1",
            self.tables.component
        ))?;

        let rows = stmt
            .query_map(params![line_num], |row| {
                Ok(ComponentRow {
                    line_num,
                    lname: row.get(0)?,
                    fname: row.get(1)?,
                    mname: row.get(2)?,
                    m2name: row.get(3)?,
                    nb: row.get(4)?,
                    id: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows
                .into_iter()
                .next()
                .map(|row| ComponentRecord::from_row(row, self.observation_year))),
            n => Err(StoreError::AmbiguousComponent { line_num, rows: n }),
        }
    }

    fn lookup_standard_names(&self, raw_name: &str) -> StoreResult<Vec<StandardName>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT StandardName, Appearances FROM \"{}\"
             WHERE NonStandardName = ?1
             ORDER BY Appearances DESC, StandardName ASC",
            self.tables.aliases
        ))?;

        let names = stmt
            .query_map(params![raw_name], |row| {
                Ok(StandardName {
                    canonical: row.get(0)?,
                    appearances: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(names)
    }

    fn find_candidates_by_first_last(
        &self,
        first: &str,
        last: &str,
    ) -> StoreResult<Vec<MasterCandidate>> {
        self.find_candidates("mlname", first, last)
    }

    fn find_candidates_by_first_middle(
        &self,
        first: &str,
        middle: &str,
    ) -> StoreResult<Vec<MasterCandidate>> {
        self.find_candidates("smmname", first, middle)
    }

    fn append_result(&mut self, result: &MatchResult) -> StoreResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO \"{}\" (
                    line_num, recommendation, fitness, ground_truth, correct, matches,
                    policy, run_id, processed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                self.tables.results
            ),
            params![
                result.line_num,
                result.recommendation.to_string(),
                result.fitness,
                result.ground_truth,
                result.correct.code(),
                result.ranked_string(),
                result.policy.as_str(),
                self.run_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
