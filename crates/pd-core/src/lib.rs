//! pd-core - Core value types for plugdb
//!
//! This crate provides the tagged [`Cell`] value shared by client code and
//! backend modules, the [`Row`] and [`Table`] containers built from cells,
//! and [`ConnectionParameters`] with its YAML configuration loader.

pub mod cell;
pub mod error;
pub mod params;
pub mod row;
pub mod table;

pub use cell::{Blob, BlobInput, Cell, CellValue, TypeId};
pub use error::{CoreError, CoreResult};
pub use params::{ConnectionParameters, TlsMode};
pub use row::Row;
pub use table::Table;
