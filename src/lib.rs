//! Purpose: Library crate behind the `notedump` CLI and its tests.
//! Exports: `api` (inspection entry points), `core` (store, archive, errors), `notice`.
//! Role: Keeps database and decoding logic out of the binary so tests can drive it.
//! Invariants: Nothing in this crate writes to the inspected database.
pub mod api;
pub mod core;
pub mod notice;
