use super::conventions::{strip_footnotes, Conventions, MAX_CODENAMES, VERSION_TOKEN_RE};
use super::error::ExtractError;
use super::table::{clean_text, Table, TableCell, TableRow};
use crate::version::Version;

/// One value per model slot: each data cell's value is repeated `colspan` times.
///
/// The expanded length must equal `models`; anything else means the row no
/// longer lines up with the header.
pub fn expand_row<T, F>(
    table: &Table,
    row: &TableRow,
    models: usize,
    mut extract: F,
) -> Result<Vec<T>, ExtractError>
where
    T: Clone,
    F: FnMut(&TableCell) -> Result<T, ExtractError>,
{
    let mut values = Vec::with_capacity(models);
    for cell in row.data() {
        let spanned = values.len().saturating_add(cell.colspan);
        if spanned > models {
            return Err(count_mismatch(table, row, spanned, models));
        }
        let value = extract(cell)?;
        values.extend(std::iter::repeat(value).take(cell.colspan));
    }
    if values.len() != models {
        return Err(count_mismatch(table, row, values.len(), models));
    }
    Ok(values)
}

fn count_mismatch(table: &Table, row: &TableRow, got: usize, models: usize) -> ExtractError {
    ExtractError::mismatch(
        table.index,
        Some(row.index),
        format!("row spans {} model columns, header declares {}", got, models),
    )
}

pub fn processors(table: &Table, row: &TableRow, models: usize) -> Result<Vec<String>, ExtractError> {
    expand_row(table, row, models, |cell| Ok(clean_text(&strip_footnotes(&cell.text))))
}

/// Hardware identifiers are read from the cell markup, first two distinct
/// matches in source order.
pub fn codenames(
    table: &Table,
    row: &TableRow,
    models: usize,
    conventions: &Conventions,
) -> Result<Vec<Vec<String>>, ExtractError> {
    expand_row(table, row, models, |cell| {
        let mut found: Vec<String> = Vec::new();
        for m in conventions.codename_re().find_iter(&cell.html) {
            if found.len() == MAX_CODENAMES {
                break;
            }
            if !found.iter().any(|f| f == m.as_str()) {
                found.push(m.as_str().to_string());
            }
        }
        if found.is_empty() {
            return Err(ExtractError::PatternNotFound {
                table: table.index,
                row: row.index,
                pattern: "hardware identifier",
                cell: clean_text(&cell.text),
            });
        }
        Ok(found)
    })
}

/// `None` for a cell that is empty once footnotes are gone.
pub fn release_versions(
    table: &Table,
    row: &TableRow,
    models: usize,
) -> Result<Vec<Option<Version>>, ExtractError> {
    expand_row(table, row, models, |cell| {
        let text = clean_text(&strip_footnotes(&cell.text));
        if text.is_empty() {
            return Ok(None);
        }
        let token = VERSION_TOKEN_RE
            .find(&text)
            .ok_or_else(|| ExtractError::PatternNotFound {
                table: table.index,
                row: row.index,
                pattern: "version",
                cell: text.clone(),
            })?;
        Version::parse(token.as_str())
            .map(Some)
            .map_err(|source| ExtractError::VersionFormat {
                table: table.index,
                row: row.index,
                source,
            })
    })
}
