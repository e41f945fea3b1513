use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static WIKITABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.wikitable").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Header,
    Data,
}

#[derive(Debug, Clone)]
pub struct TableCell {
    pub kind: CellKind,
    /// Text content with entities decoded, whitespace untouched.
    pub text: String,
    /// Inner markup as serialized by the parser.
    pub html: String,
    pub colspan: usize,
    pub id: Option<String>,
    /// Grid column of the cell's left edge, accounting for row and column spans.
    pub col: usize,
}

impl TableCell {
    /// Whether the cell occupies grid column `col`.
    pub fn covers(&self, col: usize) -> bool {
        self.col <= col && col < self.col.saturating_add(self.colspan)
    }
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub index: usize,
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn headers(&self) -> impl Iterator<Item = &TableCell> {
        self.cells.iter().filter(|c| c.kind == CellKind::Header)
    }

    pub fn data(&self) -> impl Iterator<Item = &TableCell> {
        self.cells.iter().filter(|c| c.kind == CellKind::Data)
    }

    /// Cleaned text of the `n`th header cell.
    pub fn header_text(&self, n: usize) -> Option<String> {
        self.headers().nth(n).map(|c| clean_text(&c.text))
    }

    pub fn cell_at(&self, col: usize) -> Option<&TableCell> {
        self.cells.iter().find(|c| c.covers(col))
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    /// Position among the page's `.wikitable`s, used in diagnostics.
    pub index: usize,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn header_row(&self) -> Option<&TableRow> {
        self.rows.first()
    }
}

/// Collapse runs of whitespace (including non-breaking spaces) into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All `table.wikitable` elements of a document, in document order.
pub fn wikitables(doc: &Html) -> Vec<Table> {
    doc.select(&WIKITABLE)
        .enumerate()
        .map(|(index, el)| read_table(index, el))
        .collect()
}

pub fn read_table(index: usize, table: ElementRef<'_>) -> Table {
    // rows still covered by a rowspan from above, per grid column
    let mut pending: Vec<usize> = Vec::new();
    let rows = direct_rows(table)
        .into_iter()
        .enumerate()
        .map(|(row_idx, tr)| read_row(row_idx, tr, &mut pending))
        .collect();
    Table { index, rows }
}

fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn read_row(index: usize, tr: ElementRef<'_>, pending: &mut Vec<usize>) -> TableRow {
    let occupied: Vec<bool> = pending.iter().map(|n| *n > 0).collect();
    for n in pending.iter_mut() {
        *n = n.saturating_sub(1);
    }

    let mut cells = Vec::new();
    let mut col = 0;
    for el in tr.children().filter_map(ElementRef::wrap) {
        let kind = match el.value().name() {
            "th" => CellKind::Header,
            "td" => CellKind::Data,
            _ => continue,
        };
        while occupied.get(col).copied().unwrap_or(false) {
            col += 1;
        }
        let colspan = span_attr(el, "colspan", MAX_COLSPAN);
        let rowspan = span_attr(el, "rowspan", MAX_ROWSPAN);
        if rowspan > 1 {
            if pending.len() < col + colspan {
                pending.resize(col + colspan, 0);
            }
            for slot in &mut pending[col..col + colspan] {
                *slot = (*slot).max(rowspan - 1);
            }
        }
        cells.push(TableCell {
            kind,
            text: el.text().collect(),
            html: el.inner_html(),
            colspan,
            id: el.value().attr("id").map(str::to_string),
            col,
        });
        col += colspan;
    }
    TableRow { index, cells }
}

// HTML parsing caps: larger spans are clamped, not rejected.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

// Browsers treat a missing, zero or unparsable span as 1. Values too large for
// a usize are clamped like any other oversized span.
fn span_attr(el: ElementRef<'_>, name: &str, max: usize) -> usize {
    let Some(raw) = el.value().attr(name).map(str::trim) else {
        return 1;
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    match raw.parse::<usize>() {
        Ok(0) => 1,
        Ok(n) => n.min(max),
        Err(_) => max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(html: &str) -> Vec<Table> {
        wikitables(&Html::parse_document(html))
    }

    #[test]
    fn only_wikitables_are_read() {
        let t = tables(
            r#"<table><tr><td>x</td></tr></table>
               <table class="wikitable sortable"><tr><th>Model</th></tr></table>
               <table class="wikitable"><tr><th>Version</th></tr></table>"#,
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].index, 0);
        assert_eq!(t[1].rows[0].header_text(0).as_deref(), Some("Version"));
    }

    #[test]
    fn cells_keep_kind_span_and_markup() {
        let t = tables(
            r#"<table class="wikitable"><tbody>
               <tr><th id="h">Processor</th><td colspan="2">Apple <b>A4</b></td><td colspan="x">y</td></tr>
               </tbody></table>"#,
        );
        let row = &t[0].rows[0];
        assert_eq!(row.headers().count(), 1);
        let data: Vec<_> = row.data().collect();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].colspan, 2);
        assert_eq!(data[0].text, "Apple A4");
        assert_eq!(data[0].html, "Apple <b>A4</b>");
        assert_eq!(data[1].colspan, 1);
        assert_eq!(data[1].col, 3);
        assert_eq!(row.cells[0].id.as_deref(), Some("h"));
    }

    #[test]
    fn rowspans_shift_grid_columns() {
        let t = tables(
            r#"<table class="wikitable">
               <tr><th>SoC</th><th>RAM</th><th>Model</th></tr>
               <tr><td>A4</td><td rowspan="2">512 MB</td><td>iPhone 4</td></tr>
               <tr><td>A5</td><td>iPhone 4S</td></tr>
               </table>"#,
        );
        let third = &t[0].rows[2];
        assert_eq!(third.cells[0].col, 0);
        assert_eq!(third.cells[1].col, 2);
        assert_eq!(clean_text(&third.cell_at(2).unwrap().text), "iPhone 4S");
        assert!(third.cell_at(1).is_none());
    }

    #[test]
    fn oversized_spans_are_clamped() {
        let t = tables(
            r#"<table class="wikitable">
               <tr><td colspan="18446744073709551615">a</td><td colspan="99999999999999999999999">b</td></tr>
               <tr><td colspan="5000" rowspan="18446744073709551615">c</td><td>d</td></tr>
               <tr><td>e</td></tr>
               </table>"#,
        );
        let first = &t[0].rows[0];
        assert_eq!(first.cells[0].colspan, MAX_COLSPAN);
        assert_eq!(first.cells[1].colspan, MAX_COLSPAN);
        assert_eq!(first.cells[1].col, MAX_COLSPAN);

        let second = &t[0].rows[1];
        assert_eq!(second.cells[0].colspan, MAX_COLSPAN);
        assert_eq!(second.cells[1].col, MAX_COLSPAN);
        // the clamped rowspan still pushes the next row past the covered columns
        assert_eq!(t[0].rows[2].cells[0].col, MAX_COLSPAN);
        assert!(t[0].rows[2].cell_at(usize::MAX).is_none());
    }

    #[test]
    fn clean_text_collapses_nbsp() {
        assert_eq!(clean_text("  iOS\u{a0}16\n 7 "), "iOS 16 7");
    }
}
