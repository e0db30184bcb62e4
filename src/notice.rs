//! Purpose: Define a structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `NoticeKind`, `notice_json`.
//! Role: Shared contract helper for CLI diagnostics that do not stop a run.
//! Invariants: Notices never alter stdout payloads.
//! Invariants: JSON field set is additive-only.
use serde_json::{Map, Value, json};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    MissingTable,
    UnexpectedArchiver,
}

impl NoticeKind {
    pub fn label(self) -> &'static str {
        match self {
            NoticeKind::MissingTable => "missing_table",
            NoticeKind::UnexpectedArchiver => "unexpected_archiver",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub time: String,
    pub cmd: String,
    pub db: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind.label()));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("db".to_string(), json!(notice.db));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}
