//! Fixed patterns and header vocabulary of the encyclopedia's tables.

use std::sync::LazyLock;

use regex::Regex;

/// Bracketed footnote references left in cell text: `[12]`, `[a]`.
pub static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*(?:\d+|[a-z])\s*\]").unwrap());

/// Version-shaped token inside free text, one to three components.
pub static VERSION_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+){0,2}").unwrap());

/// Release number as listed on per-release pages (at least two components).
pub static RELEASE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").unwrap());

/// Whole `id` attribute of a summary-table header cell.
pub static VERSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(?:\.\d+)?$").unwrap());

pub static SUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<sup\b[^>]*>.*?</sup>").unwrap());

pub static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

pub static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Chip family naming: `A4`, `A5X`, `A10 Fusion`, `A17 Pro`, with an optional vendor prefix.
pub static PROCESSOR_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Apple\s+)?(A[0-9]+X?(?: Fusion| Bionic| Pro)?)").unwrap());

pub const MODEL_LABELS: &[&str] = &["Model", "Models"];
pub const SOC_LABELS: &[&str] = &["System-on-chip", "System on chip", "SoC"];
pub const VERSION_LABELS: &[&str] = &["Version"];

pub const MAX_CODENAMES: usize = 2;

#[cfg(test)]
static IPHONE: LazyLock<Conventions> = LazyLock::new(|| {
    Conventions::new("iPhone", "iPhone").unwrap()
});

/// The per-device-family part of the conventions: which header names models
/// and what a hardware identifier looks like.
#[derive(Debug, Clone)]
pub struct Conventions {
    model_prefix: String,
    codename_re: Regex,
}

impl Conventions {
    /// `codename_family` followed by `<int>,<int>`, e.g. `iPhone10,3`.
    pub fn new(model_prefix: &str, codename_family: &str) -> Result<Self, regex::Error> {
        let codename_re = Regex::new(&format!(r"{}[0-9]+,[0-9]+", regex::escape(codename_family)))?;
        Ok(Conventions {
            model_prefix: model_prefix.to_string(),
            codename_re,
        })
    }

    #[cfg(test)]
    pub fn iphone() -> &'static Conventions {
        &IPHONE
    }

    pub fn codename_re(&self) -> &Regex {
        &self.codename_re
    }

    pub fn is_model_name(&self, text: &str) -> bool {
        text.to_lowercase()
            .starts_with(&self.model_prefix.to_lowercase())
    }
}

pub fn strip_footnotes(text: &str) -> String {
    FOOTNOTE_RE.replace_all(text, "").into_owned()
}

pub fn matches_label(text: &str, labels: &[&str]) -> bool {
    labels.iter().any(|l| text.eq_ignore_ascii_case(l))
}
