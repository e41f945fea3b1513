use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use super::conventions::{matches_label, strip_footnotes, PROCESSOR_LABEL_RE, SOC_LABELS};
use super::table::{clean_text, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorRecord {
    /// Join key, e.g. `A10_Fusion`.
    pub code: String,
    pub label: String,
}

impl ProcessorRecord {
    pub fn from_label(label: &str) -> Self {
        ProcessorRecord {
            code: label.replace(' ', "_"),
            label: label.to_string(),
        }
    }
}

impl fmt::Display for ProcessorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.code)
    }
}

/// One record per chip row of every table carrying a system-on-chip column.
/// Rows whose label is not a known chip name are skipped.
pub fn extract(tables: &[Table]) -> Vec<ProcessorRecord> {
    let mut out = Vec::new();
    for table in tables {
        let Some(col) = soc_column(table) else {
            continue;
        };
        debug!(table = table.index, col, "system-on-chip table");
        for row in table.rows.iter().skip(1) {
            // A chip cell spanning down from an earlier row has no cell here.
            let Some(cell) = row.cell_at(col) else {
                continue;
            };
            let text = clean_text(&strip_footnotes(&cell.text));
            match PROCESSOR_LABEL_RE.captures(&text) {
                Some(caps) => out.push(ProcessorRecord::from_label(&caps[1])),
                None => trace!(table = table.index, row = row.index, text = %text, "not a chip label"),
            }
        }
    }
    out
}

fn soc_column(table: &Table) -> Option<usize> {
    table
        .header_row()?
        .headers()
        .find(|c| matches_label(&clean_text(&strip_footnotes(&c.text)), SOC_LABELS))
        .map(|c| c.col)
}
