use tracing::{debug, trace};

use super::conventions::{
    matches_label, BR_RE, RELEASE_TOKEN_RE, SUP_RE, TAG_RE, VERSION_ID_RE, VERSION_LABELS,
};
use super::error::ExtractError;
use super::table::{clean_text, Table};
use super::Extraction;
use crate::version::Version;

/// Versions named by the `id` of header cells in a version-history summary page.
pub fn summary(tables: &[Table]) -> Extraction<Version> {
    let mut out = Extraction::default();
    for table in tables {
        for row in &table.rows {
            for cell in row.headers() {
                let Some(id) = cell.id.as_deref().map(str::trim) else {
                    continue;
                };
                if !VERSION_ID_RE.is_match(id) {
                    trace!(table = table.index, id, "header id is not a version");
                    continue;
                }
                match Version::parse(id) {
                    Ok(v) => out.records.push(v),
                    Err(source) => out.failures.push(ExtractError::VersionFormat {
                        table: table.index,
                        row: row.index,
                        source,
                    }),
                }
            }
        }
    }
    out
}

/// Versions listed in the first column of a release page's `Version` tables.
///
/// A first cell can hold several releases separated by `<br>`; each part
/// yields at most one version. Footnote superscripts are dropped first.
pub fn release_page(tables: &[Table]) -> Extraction<Version> {
    let mut out = Extraction::default();
    for table in tables.iter().filter(|t| is_version_table(t)) {
        debug!(table = table.index, rows = table.rows.len(), "release table");
        for row in table.rows.iter().skip(1) {
            let Some(first) = row.cells.first() else {
                continue;
            };
            let markup = SUP_RE.replace_all(&first.html, "");
            for part in BR_RE.split(&markup) {
                let text = clean_text(&TAG_RE.replace_all(part, " "));
                let Some(token) = RELEASE_TOKEN_RE.find(&text) else {
                    continue;
                };
                match Version::parse(token.as_str()) {
                    Ok(v) => out.records.push(v),
                    Err(source) => out.failures.push(ExtractError::VersionFormat {
                        table: table.index,
                        row: row.index,
                        source,
                    }),
                }
            }
        }
    }
    out
}

fn is_version_table(table: &Table) -> bool {
    table
        .header_row()
        .and_then(|r| r.header_text(0))
        .is_some_and(|t| matches_label(&t, VERSION_LABELS))
}
