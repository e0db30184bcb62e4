//! Purpose: Run the two inspection steps over one notifications database.
//! Exports: `Inspector`, `DecodedNotification`, `ApiResult`.
//! Role: Public boundary used by the CLI; wires store rows through archive decoding.
//! Invariants: Catalog check and row decoding share one read-only connection.
//! Invariants: Decoding is strictly sequential; the first failing row ends the pass.
use std::path::Path;

use plist::Value as ArchiveValue;
use tracing::debug;

use crate::core::archive::{FieldLayout, KeyedArchive};
use crate::core::error::Error;
use crate::core::store::{AppId, CatalogEntry, NOTIFICATIONS_TABLE, NotificationRow, NotificationStore};

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedNotification {
    pub note_id: i64,
    pub app_id: AppId,
    pub title: ArchiveValue,
    pub message: ArchiveValue,
    pub archiver: Option<String>,
    pub archive_version: Option<u64>,
    pub unexpected_archiver: bool,
}

pub struct Inspector {
    store: NotificationStore,
    layout: FieldLayout,
}

impl Inspector {
    pub fn open(db_path: impl AsRef<Path>) -> ApiResult<Self> {
        let db_path = db_path.as_ref();
        let store = NotificationStore::open(db_path)?;
        debug!(path = %db_path.display(), "opened notifications database");
        Ok(Self {
            store,
            layout: FieldLayout::default(),
        })
    }

    pub fn with_layout(mut self, layout: FieldLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Catalog entries for the `notifications` table; empty when the table is absent.
    pub fn catalog(&self) -> ApiResult<Vec<CatalogEntry>> {
        let entries = self.store.catalog(NOTIFICATIONS_TABLE)?;
        debug!(entries = entries.len(), "catalog check complete");
        Ok(entries)
    }

    pub fn for_each_notification<F>(&self, mut on_notification: F) -> ApiResult<u64>
    where
        F: FnMut(DecodedNotification) -> ApiResult<()>,
    {
        self.store.for_each_row(|row| {
            let decoded = self.decode(row)?;
            debug!(note_id = decoded.note_id, "decoded notification");
            on_notification(decoded)
        })
    }

    fn decode(&self, row: NotificationRow) -> ApiResult<DecodedNotification> {
        let path = self.store.path();
        let archive = KeyedArchive::from_bytes(&row.encoded_data)
            .map_err(|err| err.with_path(path).with_note_id(row.note_id))?;
        let content = archive
            .notification_content(self.layout)
            .map_err(|err| err.with_path(path).with_note_id(row.note_id))?;
        Ok(DecodedNotification {
            note_id: row.note_id,
            app_id: row.app_id,
            title: content.title,
            message: content.message,
            unexpected_archiver: archive.has_unexpected_archiver(),
            archiver: archive.archiver().map(str::to_string),
            archive_version: archive.version(),
        })
    }
}
