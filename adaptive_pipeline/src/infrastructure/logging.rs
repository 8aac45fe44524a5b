// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging
//!
//! `tracing-subscriber` initialization driven by [`LoggingConfig`], run once
//! at process start by the bootstrap crate.

use crate::infrastructure::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global `tracing` subscriber. Safe to call at most once per
/// process; a second call is a configuration error in the caller, not
/// something this function guards against.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.format {
        LogFormat::Pretty => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
        LogFormat::Json => {
            fmt().with_env_filter(filter).with_target(true).json().init();
        }
    }
}
