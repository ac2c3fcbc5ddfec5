//! ROWDOC Core - shared abstractions for the row/document converter
//!
//! This crate provides the traits and types the other ROWDOC crates depend
//! on. It defines:
//!
//! - `Connection` / `Transaction` - traits for the database transport
//! - `ResultCursor` - trait for a positioned query result
//! - `TypedValue` - the closed set of marshalable SQL value kinds
//! - `ColumnType` / `ColumnCategory` / `CategoryMap` - the driver type-code
//!   dispatch table
//! - Export/import configuration (`TableExportSpec`, `DependencyOrder`)

mod column;
mod config;
mod connection;
mod cursor;
mod error;
mod types;

pub use column::*;
pub use config::*;
pub use connection::*;
pub use cursor::*;
pub use error::*;
pub use types::*;
