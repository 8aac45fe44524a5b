// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration
//!
//! Layered configuration for limits, logging, and storage selection:
//! compiled-in defaults, then an optional TOML file, then environment
//! variable overrides (`ADAPTIVE_PIPELINE__SECTION__KEY`) — the same
//! precedence order the teacher's `config_service`/`generic_config_manager`
//! layering uses, built on the `config` crate rather than hand-rolled file
//! reads.

use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::value_objects::Limits;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

const ENV_PREFIX: &str = "ADAPTIVE_PIPELINE";

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    pub directory: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self { directory: "./uploads".to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3StorageConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    pub local: LocalStorageConfig,
    pub s3: S3StorageConfig,
}

/// Parsed limits, mirroring [`Limits`] field-for-field so the TOML/env
/// layer can override any subset without requiring all five.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitsConfig {
    pub file_size: Option<u64>,
    pub files: Option<u64>,
    pub fields: Option<u64>,
    pub field_size: Option<u64>,
    pub field_name_size: Option<u64>,
}

impl LimitsConfig {
    fn into_limits(self) -> Limits {
        let mut limits = Limits::default();
        if let Some(v) = self.file_size {
            limits = limits.with_file_size(v);
        }
        if let Some(v) = self.files {
            limits = limits.with_files(v);
        }
        if let Some(v) = self.fields {
            limits = limits.with_fields(v);
        }
        if let Some(v) = self.field_size {
            limits = limits.with_field_size(v);
        }
        if let Some(v) = self.field_name_size {
            limits = limits.with_field_name_size(v);
        }
        limits
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    logging: Option<LoggingConfigRaw>,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    limits: LimitsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingConfigRaw {
    level: Option<String>,
    format: Option<LogFormat>,
}

/// The fully-resolved, application-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub limits: Limits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            limits: Limits::default(),
        }
    }
}

impl Settings {
    /// Loads settings in layers: compiled-in defaults, then `config_path` if
    /// it exists, then `ADAPTIVE_PIPELINE__SECTION__KEY` environment
    /// overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path));
            }
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let raw: RawSettings = builder
            .build()
            .map_err(|err| PipelineError::InvalidConfiguration(err.to_string()))?
            .try_deserialize()
            .map_err(|err| PipelineError::InvalidConfiguration(err.to_string()))?;

        let mut logging = LoggingConfig::default();
        if let Some(raw_logging) = raw.logging {
            if let Some(level) = raw_logging.level {
                logging.level = level;
            }
            if let Some(format) = raw_logging.format {
                logging.format = format;
            }
        }

        Ok(Self { logging, storage: raw.storage, limits: raw.limits.into_limits() })
    }
}
