use thiserror::Error;

use crate::version::VersionError;

/// A table that matched a known shape and then broke one of its assumptions.
///
/// `table` is the position of the table among the page's candidate tables,
/// `row` the position of the row inside it (0 is the header row).
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("table {table}{}: {detail}", fmt_row(.row))]
    StructuralMismatch {
        table: usize,
        row: Option<usize>,
        detail: String,
    },
    #[error("table {table}, row {row}: {source}")]
    VersionFormat {
        table: usize,
        row: usize,
        #[source]
        source: VersionError,
    },
    #[error("table {table}, row {row}: no {pattern} in cell {cell:?}")]
    PatternNotFound {
        table: usize,
        row: usize,
        pattern: &'static str,
        cell: String,
    },
}

fn fmt_row(row: &Option<usize>) -> String {
    row.map(|r| format!(", row {}", r)).unwrap_or_default()
}

impl ExtractError {
    pub fn mismatch(table: usize, row: Option<usize>, detail: impl Into<String>) -> Self {
        ExtractError::StructuralMismatch {
            table,
            row,
            detail: detail.into(),
        }
    }

    pub fn table(&self) -> usize {
        match self {
            ExtractError::StructuralMismatch { table, .. }
            | ExtractError::VersionFormat { table, .. }
            | ExtractError::PatternNotFound { table, .. } => *table,
        }
    }
}
