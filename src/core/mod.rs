// Core modules: database access, archive decoding, value rendering, errors.
pub mod archive;
pub mod error;
pub mod store;
pub mod value;
