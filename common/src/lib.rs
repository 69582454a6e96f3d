//! docdupe Common Library
//!
//! CLIと表示レイヤ（GUIなど）で共有されるデータモデル

pub mod types;
pub mod error;

pub use types::{
    DocumentKind, FileId, Location, MatchEntry, MatchTable, Occurrence, RegisteredFile,
    TABLE_MARKER,
};
pub use error::{Error, Result};
