//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Map `Parcel` records to and from the `parcel` table.
//! - Translate zero-row outcomes into typed errors.
//! - Abort in-flight statements when the caller's `OpContext` fires.
//!
//! # Invariants
//! - Every operation is exactly one SQL statement; no transactions.
//! - Address edits and deletes carry the `status = 'registered'` guard in
//!   the statement predicate itself, never as a separate read.
//! - `create` always persists `registered`, whatever status the input holds.
//! - Any status text read back is accepted; only column type mismatches fail
//!   a read.
//! - Each operation owns the connection's progress handler while it runs:
//!   a handler the caller installed is replaced, and the slot is left empty
//!   when the operation returns.

use crate::context::{Interrupt, OpContext};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus};
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

/// VM instructions between two cancellation checks while a statement runs.
const PROGRESS_CHECK_OPS: i32 = 1_000;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for parcel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Point read matched no row.
    NotFound(ParcelNumber),
    /// Update matched no row: missing parcel, or guarded by status.
    NoRowsUpdated(ParcelNumber),
    /// Delete matched no row: missing parcel, or guarded by status.
    NoRowsDeleted(ParcelNumber),
    /// Caller cancelled the operation.
    Cancelled,
    /// Caller deadline elapsed before the operation finished.
    DeadlineExceeded,
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::NoRowsUpdated(number) => {
                write!(f, "parcel store: no rows have been updated (number {number})")
            }
            Self::NoRowsDeleted(number) => {
                write!(f, "parcel store: no rows have been deleted (number {number})")
            }
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is older than required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<Interrupt> for RepoError {
    fn from(value: Interrupt) -> Self {
        match value {
            Interrupt::Cancelled => Self::Cancelled,
            Interrupt::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Repository interface for parcel CRUD operations.
///
/// Every call honours the cancellation and deadline carried by `ctx`.
pub trait ParcelRepository {
    /// Inserts a parcel as `registered` and returns its assigned number.
    fn create(&self, ctx: &OpContext, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Fetches one parcel; `NotFound` when no row matches.
    fn get(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Fetches every parcel owned by `client`; empty when none.
    fn list_by_client(&self, ctx: &OpContext, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites status without checking the current value.
    fn set_status(
        &self,
        ctx: &OpContext,
        number: ParcelNumber,
        status: &ParcelStatus,
    ) -> RepoResult<()>;
    /// Overwrites address only while the parcel is `registered`.
    fn set_address(&self, ctx: &OpContext, number: ParcelNumber, address: &str)
        -> RepoResult<()>;
    /// Removes the parcel only while it is `registered`.
    fn delete(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<()>;
}

/// SQLite-backed parcel repository over a caller-owned connection.
pub struct SqliteParcelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelRepository<'conn> {
    /// Constructs a repository from a provisioned connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is behind.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when `parcel` does
    ///   not have the expected shape.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Runs one statement under the context's cancellation and deadline.
    fn guarded<T, F>(&self, ctx: &OpContext, op: &'static str, run: F) -> RepoResult<T>
    where
        F: FnOnce(&Connection) -> RepoResult<T>,
    {
        if let Some(reason) = ctx.interrupt() {
            warn!("event=parcel_{op} module=repo status=interrupted stage=before reason={reason:?}");
            return Err(reason.into());
        }

        let probe = ctx.clone();
        self.conn
            .progress_handler(PROGRESS_CHECK_OPS, Some(move || probe.interrupt().is_some()));
        let result = run(self.conn);
        self.conn.progress_handler(0, None::<fn() -> bool>);

        result.map_err(|err| match (is_interrupted(&err), ctx.interrupt()) {
            (true, Some(reason)) => {
                warn!(
                    "event=parcel_{op} module=repo status=interrupted stage=running reason={reason:?}"
                );
                reason.into()
            }
            _ => err,
        })
    }
}

impl ParcelRepository for SqliteParcelRepository<'_> {
    fn create(&self, ctx: &OpContext, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        let number = self.guarded(ctx, "create", |conn| {
            conn.execute(
                "INSERT INTO parcel (client, status, address, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    parcel.client,
                    ParcelStatus::Registered.as_str(),
                    parcel.address.as_str(),
                    parcel.created_at.as_str(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!(
            "event=parcel_create module=repo status=ok number={} client={}",
            number, parcel.client
        );
        Ok(number)
    }

    fn get(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<Parcel> {
        self.guarded(ctx, "get", |conn| {
            let mut stmt = conn.prepare(&format!("{PARCEL_SELECT_SQL} WHERE number = ?1;"))?;
            let mut rows = stmt.query(params![number])?;
            if let Some(row) = rows.next()? {
                return parse_parcel_row(row);
            }

            Err(RepoError::NotFound(number))
        })
    }

    fn list_by_client(&self, ctx: &OpContext, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.guarded(ctx, "list_by_client", |conn| {
            let mut stmt = conn.prepare(&format!("{PARCEL_SELECT_SQL} WHERE client = ?1;"))?;
            let mut rows = stmt.query(params![client])?;
            let mut parcels = Vec::new();

            // Each row is decoded as the cursor yields it; a failure part way
            // through drops everything collected so far.
            while let Some(row) = rows.next()? {
                parcels.push(parse_parcel_row(row)?);
            }

            Ok(parcels)
        })
    }

    fn set_status(
        &self,
        ctx: &OpContext,
        number: ParcelNumber,
        status: &ParcelStatus,
    ) -> RepoResult<()> {
        let changed = self.guarded(ctx, "set_status", |conn| {
            Ok(conn.execute(
                "UPDATE parcel SET status = ?1 WHERE number = ?2;",
                params![status.as_str(), number],
            )?)
        })?;

        if changed == 0 {
            warn!("event=parcel_set_status module=repo status=rejected number={number} reason=no_rows");
            return Err(RepoError::NoRowsUpdated(number));
        }

        debug!("event=parcel_set_status module=repo status=ok number={number} value={status}");
        Ok(())
    }

    fn set_address(
        &self,
        ctx: &OpContext,
        number: ParcelNumber,
        address: &str,
    ) -> RepoResult<()> {
        let changed = self.guarded(ctx, "set_address", |conn| {
            Ok(conn.execute(
                "UPDATE parcel SET address = ?1 WHERE number = ?2 AND status = ?3;",
                params![address, number, ParcelStatus::Registered.as_str()],
            )?)
        })?;

        if changed == 0 {
            warn!("event=parcel_set_address module=repo status=rejected number={number} reason=no_rows");
            return Err(RepoError::NoRowsUpdated(number));
        }

        debug!("event=parcel_set_address module=repo status=ok number={number}");
        Ok(())
    }

    fn delete(&self, ctx: &OpContext, number: ParcelNumber) -> RepoResult<()> {
        let changed = self.guarded(ctx, "delete", |conn| {
            Ok(conn.execute(
                "DELETE FROM parcel WHERE number = ?1 AND status = ?2;",
                params![number, ParcelStatus::Registered.as_str()],
            )?)
        })?;

        if changed == 0 {
            warn!("event=parcel_delete module=repo status=rejected number={number} reason=no_rows");
            return Err(RepoError::NoRowsDeleted(number));
        }

        debug!("event=parcel_delete module=repo status=ok number={number}");
        Ok(())
    }
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    let status_text: String = row.get("status")?;

    Ok(Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: ParcelStatus::from(status_text),
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}

fn is_interrupted(err: &RepoError) -> bool {
    match err {
        RepoError::Db(db_err) => matches!(
            db_err.as_sqlite(),
            Some(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::OperationInterrupted
        ),
        _ => false,
    }
}

fn ensure_parcel_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "parcel")? {
        return Err(RepoError::MissingRequiredTable("parcel"));
    }

    for column in PARCEL_COLUMNS {
        if !table_has_column(conn, "parcel", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "parcel",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
