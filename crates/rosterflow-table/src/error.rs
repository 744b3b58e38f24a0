//! Errors produced while decoding, parsing, or re-serializing roster tables.

/// Table pipeline errors.
///
/// `MalformedPayload` and `UnparseableTable` are the two caller-visible
/// failure classes; the remaining variants carry serialization failures from
/// the underlying writers.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unparseable table: {0}")]
    UnparseableTable(String),

    #[error("Table write failed: {0}")]
    Write(String),
}

impl From<rust_xlsxwriter::XlsxError> for TableError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        TableError::Write(format!("xlsx: {}", err))
    }
}

impl From<csv::Error> for TableError {
    fn from(err: csv::Error) -> Self {
        TableError::Write(format!("csv: {}", err))
    }
}
