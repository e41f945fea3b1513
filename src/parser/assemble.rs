use std::fmt;

use serde::Serialize;

use super::error::ExtractError;
use crate::version::{Version, VersionRange};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub model_name: String,
    /// Unique, in order of first appearance; usually one, two for regional SKUs.
    pub codenames: Vec<String>,
    /// Empty when unset.
    pub processor: String,
    /// `0.0.0` when unset.
    pub min_version: Version,
    pub max_version: Version,
}

impl DeviceRecord {
    pub fn supported(&self) -> VersionRange {
        VersionRange::closed(self.min_version, self.max_version)
    }

    pub fn has_unset_fields(&self) -> bool {
        self.processor.is_empty() || self.min_version.is_unset() || self.max_version.is_unset()
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) [{}] - Support: [{}, {}]",
            self.model_name,
            self.codenames.join("; "),
            self.processor,
            self.min_version,
            self.max_version
        )
    }
}

/// Per-field value sequences of one table, each indexed by model position.
/// `None` means the row was never found.
#[derive(Debug, Default)]
pub struct FieldColumns {
    pub processors: Option<Vec<String>>,
    pub codenames: Option<Vec<Vec<String>>>,
    pub min_versions: Option<Vec<Option<Version>>>,
    pub max_versions: Option<Vec<Option<Version>>>,
}

/// Zip header models with their field values, preserving header order.
pub fn assemble(
    table: usize,
    models: &[String],
    columns: FieldColumns,
) -> Result<Vec<DeviceRecord>, ExtractError> {
    let n = models.len();
    let processors = column(table, "processor", columns.processors, n)?;
    let codenames = column(table, "hardware strings", columns.codenames, n)?;
    let min_versions = column(table, "initial release", columns.min_versions, n)?;
    let max_versions = column(table, "latest release", columns.max_versions, n)?;

    let records = models
        .iter()
        .zip(processors)
        .zip(codenames)
        .zip(min_versions.into_iter().zip(max_versions))
        .map(|(((model, processor), codenames), (min, max))| DeviceRecord {
            model_name: model.clone(),
            codenames: codenames.unwrap_or_default(),
            processor: processor.unwrap_or_default(),
            min_version: min.flatten().unwrap_or_default(),
            max_version: max.flatten().unwrap_or_default(),
        })
        .collect();
    Ok(records)
}

/// Length-checked column, or `n` unset slots when the row was absent.
fn column<T>(
    table: usize,
    field: &str,
    values: Option<Vec<T>>,
    n: usize,
) -> Result<Vec<Option<T>>, ExtractError> {
    match values {
        None => Ok(std::iter::repeat_with(|| None).take(n).collect()),
        Some(v) if v.len() == n => Ok(v.into_iter().map(Some).collect()),
        Some(v) => Err(ExtractError::mismatch(
            table,
            None,
            format!("{} values for {} models in {} field", v.len(), n, field),
        )),
    }
}
