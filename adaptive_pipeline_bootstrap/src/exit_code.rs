// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! Maps a failed run to a `sysexits.h`-style process exit code, so shell
//! scripts and process supervisors driving this CLI can distinguish bad
//! input from a configuration problem from an I/O failure without parsing
//! stderr.

use adaptive_pipeline_domain::error::PipelineError;
use std::process::ExitCode as StdExitCode;

/// Process exit codes this CLI can return, drawn from the BSD `sysexits.h`
/// convention the original CLI's error mapping followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful completion.
    Ok,
    /// Command line usage error.
    Usage,
    /// Input data was incorrect in some way (framing/limit errors).
    DataErr,
    /// An input file did not exist or was not readable.
    NoInput,
    /// Internal software error (a bug, not bad input).
    Software,
    /// Something on the system (e.g. configuration) was not set up correctly.
    Config,
    /// Temporary failure (I/O, resource pressure) — retrying later may help.
    Temporary,
}

impl ExitCode {
    /// The numeric code, matching `sysexits.h` where it defines one.
    pub fn code(self) -> u8 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::Usage => 64,
            ExitCode::DataErr => 65,
            ExitCode::NoInput => 66,
            ExitCode::Software => 70,
            ExitCode::Config => 78,
            ExitCode::Temporary => 75,
        }
    }
}

impl From<ExitCode> for StdExitCode {
    fn from(code: ExitCode) -> Self {
        StdExitCode::from(code.code())
    }
}

/// Maps a pipeline failure to the exit code a caller's shell should see.
pub fn map_error_to_exit_code(error: &PipelineError) -> ExitCode {
    match error {
        PipelineError::Framing(_) => ExitCode::DataErr,
        PipelineError::LimitExceeded { .. } => ExitCode::DataErr,
        PipelineError::Plugin(_) => ExitCode::DataErr,
        PipelineError::InvalidStream(_) => ExitCode::Software,
        PipelineError::Io(_) => ExitCode::Temporary,
        PipelineError::InvalidConfiguration(_) => ExitCode::Config,
        PipelineError::Cancelled(_) => ExitCode::Temporary,
        PipelineError::Internal(_) => ExitCode::Software,
    }
}

/// Converts a top-level `Result` into the process exit code main() returns,
/// logging the error (if any) before mapping it.
pub fn result_to_exit_code(result: Result<(), PipelineError>) -> StdExitCode {
    match result {
        Ok(()) => StdExitCode::from(ExitCode::Ok),
        Err(err) => {
            tracing::error!(error = %err, code = err.code().as_str(), "run failed");
            StdExitCode::from(map_error_to_exit_code(&err))
        }
    }
}
