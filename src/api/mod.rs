//! Purpose: Define the public Rust API boundary for notedump.
//! Exports: `Inspector` plus the core types its callers need.
//! Role: Additive-only surface for the CLI and tests; hides module layout.
//! Invariants: Callers reach storage and decoding only through this module.

mod inspector;

pub use crate::core::archive::{FieldLayout, KeyedArchive};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::store::{AppId, CatalogEntry};
pub use crate::core::value::{render_text, to_json};
pub use inspector::{ApiResult, DecodedNotification, Inspector};
