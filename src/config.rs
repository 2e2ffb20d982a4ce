use ::config::{Environment, File};
use serde::Deserialize;
use std::env;

use crate::{error::AppError, whitelist::WhitelistMode};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub model_path: String,
    pub feature_columns_path: String,
    pub label_classes_path: String,
    pub whitelist_mode: WhitelistMode,
    /// Comma separated domains appended to the built-in safe list.
    #[serde(default)]
    pub extra_safe_domains: String,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Defaults, then `urlshield.toml` if present, then `URLSHIELD_*` variables.
    /// A bare `PORT` variable wins over everything for hosted deployments.
    pub fn load() -> Result<Self, AppError> {
        let settings = ::config::Config::builder()
            .set_default("port", 5000)?
            .set_default("model_path", "model.json")?
            .set_default("feature_columns_path", "feature_columns.json")?
            .set_default("label_classes_path", "label_classes.json")?
            .set_default("whitelist_mode", "domain")?
            .set_default("extra_safe_domains", "")?
            .set_default("request_timeout_ms", 5000)?
            .add_source(File::with_name("urlshield").required(false))
            .add_source(Environment::with_prefix("URLSHIELD").try_parsing(true))
            .set_override_option("port", env::var("PORT").ok())?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn extra_safe_domains(&self) -> Vec<String> {
        self.extra_safe_domains
            .split(',')
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }
}
