pub mod assemble;
pub mod classify;
pub mod conventions;
pub mod error;
pub mod history;
pub mod processors;
pub mod rows;
pub mod table;

use scraper::Html;
use tracing::debug;

use crate::version::Version;
use assemble::{DeviceRecord, FieldColumns};
use classify::DeviceLayout;
use conventions::Conventions;
use error::ExtractError;
use processors::ProcessorRecord;
use table::Table;

/// Records from every table that extracted cleanly, plus one failure per table
/// that matched a known shape and then broke it.
#[derive(Debug)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub failures: Vec<ExtractError>,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Extraction {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Extraction<T> {
    pub fn extend(&mut self, other: Extraction<T>) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
    }
}

/// Device table pipeline: tables → layout → per-row values → records.
pub fn extract_devices(doc: &Html, conventions: &Conventions) -> Extraction<DeviceRecord> {
    let mut out = Extraction::default();
    for table in table::wikitables(doc) {
        let layout = match classify::classify_table(&table, conventions) {
            Ok(Some(layout)) => layout,
            Ok(None) => continue,
            Err(e) => {
                out.failures.push(e);
                continue;
            }
        };
        match extract_device_table(&table, &layout, conventions) {
            Ok(devices) => {
                debug!(table = table.index, devices = devices.len(), "device table extracted");
                out.records.extend(devices);
            }
            Err(e) => out.failures.push(e),
        }
    }
    out
}

pub fn extract_device_table(
    table: &Table,
    layout: &DeviceLayout,
    conventions: &Conventions,
) -> Result<Vec<DeviceRecord>, ExtractError> {
    let n = layout.models.len();
    let row = |i: usize| &table.rows[i];
    let (initial, latest) = layout.release;
    let columns = FieldColumns {
        processors: Some(rows::processors(table, row(layout.processor), n)?),
        codenames: Some(rows::codenames(table, row(layout.hardware), n, conventions)?),
        min_versions: Some(rows::release_versions(table, row(initial), n)?),
        max_versions: Some(rows::release_versions(table, row(latest), n)?),
    };
    assemble::assemble(table.index, &layout.models, columns)
}

pub fn extract_processors(doc: &Html) -> Vec<ProcessorRecord> {
    processors::extract(&table::wikitables(doc))
}

pub fn extract_summary_versions(doc: &Html) -> Extraction<Version> {
    history::summary(&table::wikitables(doc))
}

pub fn extract_release_versions(doc: &Html) -> Extraction<Version> {
    history::release_page(&table::wikitables(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(path: &str) -> Html {
        Html::parse_document(&std::fs::read_to_string(path).unwrap())
    }

    #[test]
    fn synthetic_two_model_table() {
        let html = r#"
            <table class="wikitable">
              <tr><th>Model</th><th>PhoneA</th><th>PhoneB</th></tr>
              <tr><th>Processor</th><td colspan="2">ChipX</td></tr>
              <tr><th>Hardware strings</th><td>PhoneX1,1</td><td>PhoneX2,1</td></tr>
              <tr><th>Initial release operating system</th><td>1.0</td><td>1.0</td></tr>
              <tr><th>Latest release operating system</th><td>2.0</td><td>3.0</td></tr>
            </table>"#;
        let conventions = Conventions::new("Phone", "PhoneX").unwrap();
        let out = extract_devices(&Html::parse_document(html), &conventions);
        assert!(out.failures.is_empty(), "{:?}", out.failures);
        assert_eq!(
            out.records,
            vec![
                DeviceRecord {
                    model_name: "PhoneA".into(),
                    codenames: vec!["PhoneX1,1".into()],
                    processor: "ChipX".into(),
                    min_version: Version::new(1, 0, 0),
                    max_version: Version::new(2, 0, 0),
                },
                DeviceRecord {
                    model_name: "PhoneB".into(),
                    codenames: vec!["PhoneX2,1".into()],
                    processor: "ChipX".into(),
                    min_version: Version::new(1, 0, 0),
                    max_version: Version::new(3, 0, 0),
                },
            ]
        );
    }

    fn phone_tables(processor_row: &str) -> String {
        format!(
            r#"<table class="wikitable">
                 <tr><th>Model</th><th>PhoneA</th><th>PhoneB</th></tr>
                 <tr><th>Processor</th>{}</tr>
                 <tr><th>Hardware strings</th><td>PhoneX1,1</td><td>PhoneX2,1</td></tr>
                 <tr><th>Initial release operating system</th><td>1.0</td><td>1.0</td></tr>
                 <tr><th>Latest release operating system</th><td>2.0</td><td>3.0</td></tr>
               </table>
               <table class="wikitable">
                 <tr><th>Model</th><th>PhoneC</th></tr>
                 <tr><th>Processor</th><td>ChipY</td></tr>
                 <tr><th>Hardware strings</th><td>PhoneX3,1</td></tr>
                 <tr><th>Initial release operating system</th><td>2.0</td></tr>
                 <tr><th>Latest release operating system</th><td>4.1</td></tr>
               </table>"#,
            processor_row
        )
    }

    fn assert_first_table_lost(html: &str) {
        let conventions = Conventions::new("Phone", "PhoneX").unwrap();
        let out = extract_devices(&Html::parse_document(html), &conventions);
        assert_eq!(out.failures.len(), 1, "{:?}", out.failures);
        let failure = &out.failures[0];
        assert_eq!(failure.table(), 0);
        assert!(
            matches!(failure, ExtractError::StructuralMismatch { row: Some(1), .. }),
            "{failure}"
        );
        let names: Vec<&str> = out.records.iter().map(|d| d.model_name.as_str()).collect();
        assert_eq!(names, ["PhoneC"]);
        assert_eq!(out.records[0].max_version, Version::new(4, 1, 0));
    }

    #[test]
    fn huge_colspan_loses_only_its_table() {
        assert_first_table_lost(&phone_tables(
            r#"<td colspan="18446744073709551615">ChipX</td>"#,
        ));
    }

    #[test]
    fn huge_colspan_and_rowspan_lose_only_their_table() {
        assert_first_table_lost(&phone_tables(
            r#"<td colspan="99999999999999999999" rowspan="18446744073709551615">ChipX</td>"#,
        ));
    }

    #[test]
    fn models_page_fixture() {
        let out = extract_devices(&doc("tests/fixtures/iphone_models.html"), Conventions::iphone());
        let names: Vec<&str> = out.records.iter().map(|d| d.model_name.as_str()).collect();
        assert_eq!(names, ["iPhone", "iPhone 3G", "iPhone 3GS", "iPhone 8", "iPhone 8 Plus", "iPhone X"]);

        let original = &out.records[0];
        assert_eq!(original.processor, "Samsung S5L8900");
        assert_eq!(original.codenames, ["iPhone1,1"]);
        assert_eq!(original.supported().to_string(), "[1.0.0,3.1.3]");

        let x = &out.records[5];
        assert_eq!(x.codenames, ["iPhone10,3", "iPhone10,6"]);
        assert_eq!(x.processor, "Apple A11 Bionic");
        assert_eq!(x.min_version, Version::new(11, 0, 1));
        assert_eq!(x.max_version, Version::new(16, 7, 10));

        // the third device table drops a cell in its processor row
        assert_eq!(out.failures.len(), 1);
        let failure = &out.failures[0];
        assert_eq!(failure.table(), 3);
        assert!(matches!(failure, ExtractError::StructuralMismatch { row: Some(1), .. }));
    }

    #[test]
    fn processors_fixture() {
        let cpus = extract_processors(&doc("tests/fixtures/iphone_models.html"));
        let codes: Vec<&str> = cpus.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["A4", "A11_Bionic"]);
    }
}
