//! Purpose: Read-only access to the notifications SQLite database.
//! Exports: `NotificationStore`, `CatalogEntry`, `NotificationRow`, `AppId`.
//! Role: The only module that talks to SQLite; maps driver failures onto `ErrorKind`.
//! Invariants: The connection is opened read-only and never creates the database file.
//! Invariants: Rows are handed out in query order; iteration stops at the first error.
use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags, Row, params};
use serde::Serialize;

use crate::core::error::{Error, ErrorKind};

pub const NOTIFICATIONS_TABLE: &str = "notifications";

const CATALOG_SQL: &str = "SELECT type, name, tbl_name, rootpage, sql FROM sqlite_master \
                           WHERE type = ?1 AND name = ?2";
const NOTIFICATIONS_SQL: &str = "SELECT note_id, app_id, encoded_data FROM notifications";

/// One `sqlite_master` row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub tbl_name: String,
    pub rootpage: i64,
    pub sql: Option<String>,
}

/// Application identifier as stored; producers use either an integer key or a bundle id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppId {
    Integer(i64),
    Text(String),
    Null,
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppId::Integer(value) => write!(f, "{value}"),
            AppId::Text(value) => f.write_str(value),
            AppId::Null => f.write_str("null"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRow {
    pub note_id: i64,
    pub app_id: AppId,
    pub encoded_data: Vec<u8>,
}

pub struct NotificationStore {
    conn: Connection,
    path: PathBuf,
}

impl NotificationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("database file not found")
                .with_path(path));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|err| sqlite_error(err, "failed to open database", path))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Catalog entries describing a table named `table` (zero or one expected).
    pub fn catalog(&self, table: &str) -> Result<Vec<CatalogEntry>, Error> {
        let mut stmt = self
            .conn
            .prepare(CATALOG_SQL)
            .map_err(|err| sqlite_error(err, "catalog query failed", &self.path))?;
        let rows = stmt
            .query_map(params!["table", table], map_catalog_row)
            .map_err(|err| sqlite_error(err, "catalog query failed", &self.path))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|err| sqlite_error(err, "catalog query failed", &self.path))?);
        }
        Ok(entries)
    }

    /// Streams every notification row to `on_row`; returns the number of rows handled.
    pub fn for_each_row<F>(&self, mut on_row: F) -> Result<u64, Error>
    where
        F: FnMut(NotificationRow) -> Result<(), Error>,
    {
        let mut stmt = self
            .conn
            .prepare(NOTIFICATIONS_SQL)
            .map_err(|err| sqlite_error(err, "notifications query failed", &self.path))?;
        let mut rows = stmt
            .query([])
            .map_err(|err| sqlite_error(err, "notifications query failed", &self.path))?;

        let mut count = 0u64;
        while let Some(row) = rows
            .next()
            .map_err(|err| sqlite_error(err, "notifications query failed", &self.path))?
        {
            let record = read_notification_row(row, &self.path)?;
            on_row(record)?;
            count += 1;
        }
        Ok(count)
    }
}

fn map_catalog_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        kind: row.get(0)?,
        name: row.get(1)?,
        tbl_name: row.get(2)?,
        rootpage: row.get(3)?,
        sql: row.get(4)?,
    })
}

fn read_notification_row(row: &Row<'_>, path: &Path) -> Result<NotificationRow, Error> {
    let note_id: i64 = row
        .get(0)
        .map_err(|err| sqlite_error(err, "unreadable note_id", path))?;
    let app_id = row
        .get_ref(1)
        .map(app_id_from_ref)
        .map_err(|err| sqlite_error(err, "unreadable app_id", path).with_note_id(note_id))?;
    let encoded_data = match row
        .get_ref(2)
        .map_err(|err| sqlite_error(err, "unreadable encoded_data", path).with_note_id(note_id))?
    {
        ValueRef::Blob(bytes) => bytes.to_vec(),
        other => {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!(
                    "encoded_data is {}, expected a blob",
                    other.data_type()
                ))
                .with_path(path)
                .with_note_id(note_id));
        }
    };
    Ok(NotificationRow {
        note_id,
        app_id,
        encoded_data,
    })
}

fn app_id_from_ref(value: ValueRef<'_>) -> AppId {
    match value {
        ValueRef::Null => AppId::Null,
        ValueRef::Integer(value) => AppId::Integer(value),
        ValueRef::Real(value) => AppId::Text(value.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            AppId::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn sqlite_error(err: rusqlite::Error, context: &str, path: &Path) -> Error {
    Error::new(sqlite_error_kind(&err))
        .with_message(context)
        .with_path(path)
        .with_source(err)
}

fn sqlite_error_kind(err: &rusqlite::Error) -> ErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ErrorKind::Busy,
            ErrorCode::PermissionDenied | ErrorCode::ReadOnly => ErrorKind::Permission,
            ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt => ErrorKind::Corrupt,
            ErrorCode::CannotOpen | ErrorCode::SystemIoFailure => ErrorKind::Io,
            ErrorCode::Unknown
                if message
                    .as_deref()
                    .is_some_and(|text| text.starts_with("no such table")) =>
            {
                ErrorKind::NotFound
            }
            _ => ErrorKind::Internal,
        },
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => ErrorKind::Corrupt,
        _ => ErrorKind::Internal,
    }
}
