//! Byte-level spreadsheet pipeline: payload codec, table parsing, canonical
//! field resolution, and re-serialization.
//!
//! Everything in this crate is synchronous, CPU-bound, and side-effect free;
//! the pipeline crate owns persistence and orchestration.

pub mod codec;
pub mod error;
pub mod fields;
pub mod parser;
pub mod table;
pub mod writer;

pub use codec::{decode_payload, encode_payload};
pub use error::TableError;
pub use fields::{CanonicalField, FieldResolver};
pub use parser::parse_table;
pub use table::{CellValue, Row, Table};
pub use writer::write_table;
