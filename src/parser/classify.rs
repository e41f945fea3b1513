use tracing::{debug, trace};

use super::conventions::{matches_label, strip_footnotes, Conventions, MODEL_LABELS};
use super::error::ExtractError;
use super::table::{clean_text, Table, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    Processor,
    HardwareIdentifiers,
    ReleaseInitial,
    ReleaseLatest,
    Unrecognized,
}

struct RowLabel {
    first: &'static str,
    /// `None`: the label must be the row's only header cell.
    second: Option<&'static str>,
    role: RowRole,
}

// "Processor" heads a rowspan over Chip/CPU/GPU lines; only the Chip line names the SoC.
const ROW_LABELS: &[RowLabel] = &[
    RowLabel { first: "Processor", second: Some("Chip"), role: RowRole::Processor },
    RowLabel { first: "Processor", second: None, role: RowRole::Processor },
    RowLabel { first: "Hardware strings", second: None, role: RowRole::HardwareIdentifiers },
    RowLabel { first: "Hardware string", second: None, role: RowRole::HardwareIdentifiers },
    RowLabel { first: "Initial release operating system", second: None, role: RowRole::ReleaseInitial },
    RowLabel { first: "Operating system", second: Some("Initial release"), role: RowRole::ReleaseInitial },
    RowLabel { first: "Latest release operating system", second: None, role: RowRole::ReleaseLatest },
    RowLabel { first: "Operating system", second: Some("Latest release"), role: RowRole::ReleaseLatest },
    RowLabel { first: "Latest release", second: None, role: RowRole::ReleaseLatest },
];

fn header_label(row: &TableRow, n: usize) -> Option<String> {
    row.header_text(n).map(|t| clean_text(&strip_footnotes(&t)))
}

pub fn classify_row(row: &TableRow) -> RowRole {
    let Some(first) = header_label(row, 0) else {
        return RowRole::Unrecognized;
    };
    let second = header_label(row, 1);
    ROW_LABELS
        .iter()
        .find(|l| {
            first.eq_ignore_ascii_case(l.first)
                && match (l.second, second.as_deref()) {
                    (Some(want), Some(got)) => got.eq_ignore_ascii_case(want),
                    (None, None) => true,
                    _ => false,
                }
        })
        .map(|l| l.role)
        .unwrap_or(RowRole::Unrecognized)
}

/// Where the fields of a device table live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    /// Model names from the header row, in column order.
    pub models: Vec<String>,
    pub processor: usize,
    pub hardware: usize,
    /// (earliest, latest) release rows; always adjacent.
    pub release: (usize, usize),
}

/// `Ok(None)` when the table is not a device table at all. An error means the
/// header committed to the device shape and a required row is missing.
pub fn classify_table(
    table: &Table,
    conventions: &Conventions,
) -> Result<Option<DeviceLayout>, ExtractError> {
    let Some(header) = table.header_row() else {
        return Ok(None);
    };
    let lead = header_label(header, 0).unwrap_or_default();
    if !matches_label(&lead, MODEL_LABELS) {
        trace!(table = table.index, lead = %lead, "not a device table");
        return Ok(None);
    }
    let second = header_label(header, 1).unwrap_or_default();
    if !conventions.is_model_name(&second) {
        debug!(table = table.index, second = %second, "model header without a known model family");
        return Ok(None);
    }

    let models: Vec<String> = header.headers().skip(1).map(|c| model_name(&c.text)).collect();

    let mut processor = None;
    let mut hardware = None;
    let mut release = None;

    let mut i = 1;
    while i < table.rows.len() {
        let row = &table.rows[i];
        match classify_row(row) {
            RowRole::Processor => set_once(&mut processor, i, table.index, "processor"),
            RowRole::HardwareIdentifiers => set_once(&mut hardware, i, table.index, "hardware strings"),
            RowRole::ReleaseInitial => {
                let latest = table.rows.get(i + 1).map(classify_row);
                if latest != Some(RowRole::ReleaseLatest) {
                    return Err(ExtractError::mismatch(
                        table.index,
                        Some(i),
                        "initial release row is not followed by a latest release row",
                    ));
                }
                set_once(&mut release, (i, i + 1), table.index, "release range");
                i += 1;
            }
            RowRole::ReleaseLatest => {
                return Err(ExtractError::mismatch(
                    table.index,
                    Some(i),
                    "latest release row without a preceding initial release row",
                ));
            }
            RowRole::Unrecognized => {}
        }
        i += 1;
    }

    let missing: Vec<&str> = [
        ("processor", processor.is_none()),
        ("hardware strings", hardware.is_none()),
        ("release range", release.is_none()),
    ]
    .into_iter()
    .filter(|(_, absent)| *absent)
    .map(|(name, _)| name)
    .collect();

    match (processor, hardware, release) {
        (Some(processor), Some(hardware), Some(release)) => Ok(Some(DeviceLayout {
            models,
            processor,
            hardware,
            release,
        })),
        _ => Err(ExtractError::mismatch(
            table.index,
            None,
            format!("device table missing {} row(s)", missing.join(", ")),
        )),
    }
}

fn model_name(text: &str) -> String {
    clean_text(&strip_footnotes(text))
}

fn set_once<T: std::fmt::Debug>(slot: &mut Option<T>, value: T, table: usize, what: &str) {
    if slot.is_some() {
        debug!(table, ?value, "ignoring repeated {} row", what);
    } else {
        *slot = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::table::wikitables;
    use scraper::Html;

    fn table(body: &str) -> Table {
        let html = format!(r#"<table class="wikitable">{}</table>"#, body);
        wikitables(&Html::parse_document(&html)).remove(0)
    }

    fn row_role(cells: &str) -> RowRole {
        classify_row(&table(&format!("<tr>{}</tr>", cells)).rows[0])
    }

    #[test]
    fn row_roles_from_header_text() {
        assert_eq!(row_role("<th>Processor</th><td>A4</td>"), RowRole::Processor);
        assert_eq!(row_role("<th>processor</th><th>Chip</th><td>A4</td>"), RowRole::Processor);
        assert_eq!(row_role("<th>Processor</th><th>CPU</th><td>1 GHz</td>"), RowRole::Unrecognized);
        assert_eq!(row_role("<th>Hardware strings[4]</th><td>x</td>"), RowRole::HardwareIdentifiers);
        assert_eq!(
            row_role("<th>Initial release operating system</th><td>1.0</td>"),
            RowRole::ReleaseInitial
        );
        assert_eq!(
            row_role("<th>Operating system</th><th>Latest release</th><td>1.0</td>"),
            RowRole::ReleaseLatest
        );
        assert_eq!(row_role("<th>Weight</th><td>135 g</td>"), RowRole::Unrecognized);
        assert_eq!(row_role("<td>no header</td>"), RowRole::Unrecognized);
    }

    const ROWS: &str = r#"
        <tr><th>Processor</th><td colspan="2">ChipX</td></tr>
        <tr><th>Hardware strings</th><td>PhoneX1,1</td><td>PhoneX2,1</td></tr>
        <tr><th>Initial release operating system</th><td>1.0</td><td>1.0</td></tr>
        <tr><th>Latest release operating system</th><td>2.0</td><td>3.0</td></tr>"#;

    #[test]
    fn device_table_layout() {
        let c = Conventions::new("Phone", "PhoneX").unwrap();
        let t = table(&format!("<tr><th>Model</th><th>PhoneA</th><th>PhoneB</th></tr>{}", ROWS));
        let layout = classify_table(&t, &c).unwrap().unwrap();
        assert_eq!(layout.models, ["PhoneA", "PhoneB"]);
        assert_eq!(layout.processor, 1);
        assert_eq!(layout.hardware, 2);
        assert_eq!(layout.release, (3, 4));
    }

    #[test]
    fn unrelated_tables_are_skipped() {
        let c = Conventions::iphone();
        let t = table("<tr><th>Version</th><th>Build</th></tr><tr><td>1.0</td><td>1A543a</td></tr>");
        assert!(classify_table(&t, c).unwrap().is_none());
        let t = table("<tr><th>Model</th><th>iPad</th></tr>");
        assert!(classify_table(&t, c).unwrap().is_none());
        assert!(classify_table(&table(""), c).unwrap().is_none());
    }

    #[test]
    fn missing_required_row_fails() {
        let c = Conventions::iphone();
        let t = table(
            r#"<tr><th>Model</th><th>iPhone</th></tr>
               <tr><th>Processor</th><td>A4</td></tr>
               <tr><th>Initial release operating system</th><td>1.0</td></tr>
               <tr><th>Latest release operating system</th><td>3.1.3</td></tr>"#,
        );
        let err = classify_table(&t, c).unwrap_err();
        assert!(err.to_string().contains("hardware strings"), "{err}");
    }

    #[test]
    fn release_pair_must_be_adjacent() {
        let c = Conventions::iphone();
        let t = table(
            r#"<tr><th>Model</th><th>iPhone</th></tr>
               <tr><th>Processor</th><td>A4</td></tr>
               <tr><th>Hardware strings</th><td>iPhone1,1</td></tr>
               <tr><th>Initial release operating system</th><td>1.0</td></tr>"#,
        );
        match classify_table(&t, c) {
            Err(ExtractError::StructuralMismatch { row, .. }) => assert_eq!(row, Some(3)),
            other => panic!("expected mismatch, got {other:?}"),
        }

        let t = table(
            r#"<tr><th>Model</th><th>iPhone</th></tr>
               <tr><th>Latest release operating system</th><td>3.1.3</td></tr>"#,
        );
        assert!(matches!(
            classify_table(&t, c),
            Err(ExtractError::StructuralMismatch { row: Some(1), .. })
        ));
    }
}
