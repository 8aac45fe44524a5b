// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration
//!
//! The bootstrap layer does not define its own configuration schema — it
//! composes the application's [`Settings`](adaptive_pipeline::infrastructure::config::Settings)
//! loader with the config file path the CLI was given, so there is exactly
//! one layered-configuration implementation in the workspace.

use adaptive_pipeline::infrastructure::config::Settings;
use adaptive_pipeline_domain::error::PipelineError;
use std::path::Path;

/// Loads application settings for this run, given the `--config` path (if
/// any) the CLI was invoked with.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, PipelineError> {
    Settings::load(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_when_no_config_path_given() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.logging.level, "info");
    }
}
