//! Purpose: Decode keyed-archive payloads and pull positional fields out of them.
//! Exports: `KeyedArchive`, `FieldLayout`, `NotificationContent`.
//! Role: Pure decoding over a byte slice; no I/O beyond the in-memory reader.
//! Invariants: The archive root must be a dictionary carrying an `$objects` array.
//! Invariants: Field reads are positional and untyped; out-of-range reads are `Layout` errors.
use std::io::Cursor;

use plist::Value;

use crate::core::error::{Error, ErrorKind};

pub const OBJECTS_KEY: &str = "$objects";
pub const EXPECTED_ARCHIVER: &str = "NSKeyedArchiver";

/// Positions of the notification fields inside `$objects`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldLayout {
    pub title_index: usize,
    pub message_index: usize,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            title_index: 2,
            message_index: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyedArchive {
    objects: Vec<Value>,
    archiver: Option<String>,
    version: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NotificationContent {
    pub title: Value,
    pub message: Value,
}

impl KeyedArchive {
    /// Accepts binary and XML property lists. `$top` is not needed for positional reads.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let root = Value::from_reader(Cursor::new(bytes)).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("encoded_data is not a valid archive")
                .with_source(err)
        })?;
        let Value::Dictionary(mut root) = root else {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message("archive root is not a dictionary"));
        };

        let objects = match root.remove(OBJECTS_KEY) {
            Some(Value::Array(objects)) => objects,
            Some(_) => {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("archive `$objects` is not an array"));
            }
            None => {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("archive has no `$objects` table"));
            }
        };

        let archiver = root
            .get("$archiver")
            .and_then(Value::as_string)
            .map(str::to_string);
        let version = root.get("$version").and_then(Value::as_unsigned_integer);

        Ok(Self {
            objects,
            archiver,
            version,
        })
    }

    pub fn objects(&self) -> &[Value] {
        &self.objects
    }

    pub fn archiver(&self) -> Option<&str> {
        self.archiver.as_deref()
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// True when `$archiver` is present and names something other than NSKeyedArchiver.
    pub fn has_unexpected_archiver(&self) -> bool {
        self.archiver
            .as_deref()
            .is_some_and(|archiver| archiver != EXPECTED_ARCHIVER)
    }

    pub fn object(&self, index: usize) -> Result<&Value, Error> {
        self.objects.get(index).ok_or_else(|| {
            Error::new(ErrorKind::Layout)
                .with_message(format!(
                    "object list has {} entries; index {index} is out of range",
                    self.objects.len()
                ))
                .with_index(index)
        })
    }

    pub fn notification_content(&self, layout: FieldLayout) -> Result<NotificationContent, Error> {
        let title = self.object(layout.title_index)?.clone();
        let message = self.object(layout.message_index)?.clone();
        Ok(NotificationContent { title, message })
    }
}
