use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::conventions::Conventions;

const WIKI: &str = "https://en.wikipedia.org/wiki";

const RELEASE_PAGES: &[&str] = &[
    "IPhone_OS_2", "IPhone_OS_3", "IPhone_OS_4", "IPhone_OS_5", "IPhone_OS_6",
    "IPhone_OS_7", "IPhone_OS_8", "IPhone_OS_9", "IPhone_OS_10", "IPhone_OS_11",
    "IPhone_OS_12", "IPhone_OS_13", "IPhone_OS_14", "IPhone_OS_15", "IPhone_OS_16",
    "IOS_17",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub models_url: String,
    pub soc_url: String,
    pub version_history_url: String,
    pub version_pages: Vec<String>,
    pub model_prefix: String,
    pub codename_family: String,
}

impl Settings {
    /// Defaults, then `appledata.toml` (or `file`), then `APPLEDATA_*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let pages: Vec<String> = RELEASE_PAGES.iter().map(|p| format!("{}/{}", WIKI, p)).collect();
        let mut builder = Config::builder()
            .set_default("db_path", "build/appledata.sqlite")?
            .set_default(
                "user_agent",
                concat!("appledata/", env!("CARGO_PKG_VERSION"), " (device catalog builder)"),
            )?
            .set_default("timeout_secs", 30_i64)?
            .set_default("max_retries", 3_i64)?
            .set_default("base_backoff_ms", 2000_i64)?
            .set_default("models_url", format!("{}/List_of_iPhone_models", WIKI))?
            .set_default(
                "soc_url",
                format!("{}/List_of_iPhone_models#iPhone_systems-on-chips", WIKI),
            )?
            .set_default("version_history_url", format!("{}/IOS_version_history", WIKI))?
            .set_default("version_pages", pages)?
            .set_default("model_prefix", "iPhone")?
            .set_default("codename_family", "iPhone")?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("appledata").required(false)),
        };

        builder
            .add_source(
                Environment::with_prefix("APPLEDATA")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("version_pages"),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn conventions(&self) -> Result<Conventions> {
        Conventions::new(&self.model_prefix, &self.codename_family)
            .with_context(|| format!("Bad codename family {:?}", self.codename_family))
    }
}
