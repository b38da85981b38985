//! # Database Writer
//!
//! Persists a [`TableBuffer`] into a table of the local SQLite file. A save runs these steps,
//! each of them safe to repeat with the same table name:
//!
//! 1. [`ensure_database_file`]: create the database file if it is missing. An existing file is
//!    never truncated.
//! 2. [`ensure_table`]: `CREATE TABLE IF NOT EXISTS` with an autoincrement `ID` and one TEXT
//!    column per grid column. A table that already exists keeps its schema; if it does not
//!    match the grid, the insert step fails and that failure is returned.
//! 3. [`insert_rows`]: insert every row with one prepared statement inside one transaction.
//!    Either all rows are committed or the transaction is rolled back.
//!
//! [`save_table`] checks the inputs first (non-empty buffer, valid table name) so a rejected
//! save never touches the disk.

pub mod statements;

use crate::error::ImportError;
use common::model::table::{Column, TableBuffer};
use log::{info, warn};
use regex::Regex;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::fs::OpenOptions;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub table_name: String,
    pub rows_inserted: usize,
    pub database_created: bool,
}

impl SaveReport {
    /// Confirmation shown to the user.
    pub fn message(&self) -> String {
        format!("Datos guardados con éxito en la tabla '{}'.", self.table_name)
    }
}

/// Saves `buffer` into `table_name` inside the database at `db_path`.
pub fn save_table(
    db_path: &Path,
    table_name: &str,
    buffer: &TableBuffer,
) -> Result<SaveReport, ImportError> {
    if buffer.is_empty() {
        return Err(ImportError::NothingToSave);
    }
    let table_name = validate_table_name(table_name)?;

    let database_created = ensure_database_file(db_path)?;
    let mut conn = Connection::open(db_path)?;
    ensure_table(&conn, table_name, buffer.columns())?;
    let rows_inserted = insert_rows(&mut conn, table_name, buffer)?;

    Ok(SaveReport {
        table_name: table_name.to_string(),
        rows_inserted,
        database_created,
    })
}

/// Trims the name and checks it is usable as a table name.
/// Letters, digits, spaces, `-` and `_` are accepted; anything else is rejected.
pub fn validate_table_name(table_name: &str) -> Result<&str, ImportError> {
    let name = table_name.trim();
    if name.is_empty() {
        return Err(ImportError::TableNameRequired);
    }

    let name_re = Regex::new(r"^[\p{L}\p{M}\p{N} \-_]+$")?;
    if !name_re.is_match(name) || name.to_lowercase().starts_with("sqlite_") {
        return Err(ImportError::InvalidTableName(name.to_string()));
    }
    Ok(name)
}

/// Creates an empty database file at `db_path` when none exists.
/// Returns `true` if the file was created by this call.
pub fn ensure_database_file(db_path: &Path) -> Result<bool, ImportError> {
    match OpenOptions::new().write(true).create_new(true).open(db_path) {
        Ok(_) => {
            info!("Created database file {}", db_path.display());
            Ok(true)
        }
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(ImportError::DatabaseFile(e)),
    }
}

/// Creates the table for `columns` unless a table with that name already exists.
pub fn ensure_table(
    conn: &Connection,
    table_name: &str,
    columns: &[Column],
) -> Result<(), ImportError> {
    conn.execute(&statements::create_table_sql(table_name, columns), [])?;
    Ok(())
}

/// Inserts every row of `buffer` in a single transaction and returns the number of rows.
/// On the first failing row the transaction is rolled back and the error is returned.
pub fn insert_rows(
    conn: &mut Connection,
    table_name: &str,
    buffer: &TableBuffer,
) -> Result<usize, ImportError> {
    let sql = statements::insert_sql(table_name, buffer.columns());
    let tx = conn.transaction()?;

    match execute_rows(&tx, &sql, buffer) {
        Ok(count) => {
            tx.commit()?;
            info!("Committed {} rows into '{}'", count, table_name);
            Ok(count)
        }
        Err(e) => {
            warn!("Insert into '{}' failed, rolling back: {}", table_name, e);
            if let Err(rollback_err) = tx.rollback() {
                warn!("Rollback of '{}' failed: {}", table_name, rollback_err);
            }
            Err(e.into())
        }
    }
}

fn execute_rows(tx: &Transaction, sql: &str, buffer: &TableBuffer) -> rusqlite::Result<usize> {
    let mut stmt = tx.prepare(sql)?;
    for row in buffer.rows() {
        stmt.execute(params_from_iter(row.cells()))?;
    }
    Ok(buffer.row_count())
}
