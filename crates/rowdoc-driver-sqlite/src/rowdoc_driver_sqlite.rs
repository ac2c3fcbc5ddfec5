//! SQLite driver
//!
//! Implements the connection and cursor contracts over rusqlite. Result
//! sets are buffered at query time, so the cursor tolerates any call order;
//! the null-timing rules of the cursor contract still hold, they are just
//! not observable here.

mod connection;

pub use connection::{SqliteConnection, SqliteTransaction};
