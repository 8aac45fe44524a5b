// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Error
//!
//! A single error enum shared by every layer of the crate. Each variant maps
//! to one of the stable wire codes a caller can match on via [`ErrorCode`],
//! so the parser, pipeline manager, and plugins can all raise the same type
//! without layering `From` conversions between half a dozen local error
//! enums.

use thiserror::Error;

/// The stable, wire-visible error codes a caller matches against.
///
/// These are the codes enumerated at the boundary in the external interface:
/// `LIMIT_FILE_SIZE`, `LIMIT_TOTAL_SIZE`, `LIMIT_FIELDS`, `LIMIT_FILES`,
/// `LIMIT_FIELD_SIZE`, `LIMIT_FIELD_NAME_SIZE`, `FRAMING_ERROR`,
/// `INVALID_STREAM`, `PIPELINE_ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    LimitFileSize,
    LimitTotalSize,
    LimitFields,
    LimitFiles,
    LimitFieldSize,
    LimitFieldNameSize,
    FramingError,
    InvalidStream,
    PipelineError,
    Cancelled,
}

impl ErrorCode {
    /// Returns the wire string for this code, as used in `onError` payloads
    /// and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::LimitFileSize => "LIMIT_FILE_SIZE",
            ErrorCode::LimitTotalSize => "LIMIT_TOTAL_SIZE",
            ErrorCode::LimitFields => "LIMIT_FIELDS",
            ErrorCode::LimitFiles => "LIMIT_FILES",
            ErrorCode::LimitFieldSize => "LIMIT_FIELD_SIZE",
            ErrorCode::LimitFieldNameSize => "LIMIT_FIELD_NAME_SIZE",
            ErrorCode::FramingError => "FRAMING_ERROR",
            ErrorCode::InvalidStream => "INVALID_STREAM",
            ErrorCode::PipelineError => "PIPELINE_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of configured limit that was exceeded, paired with the
/// configured value in [`PipelineError::LimitExceeded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    FileSize,
    TotalSize,
    Fields,
    Files,
    FieldSize,
    FieldNameSize,
}

impl LimitKind {
    fn code(self) -> ErrorCode {
        match self {
            LimitKind::FileSize => ErrorCode::LimitFileSize,
            LimitKind::TotalSize => ErrorCode::LimitTotalSize,
            LimitKind::Fields => ErrorCode::LimitFields,
            LimitKind::Files => ErrorCode::LimitFiles,
            LimitKind::FieldSize => ErrorCode::LimitFieldSize,
            LimitKind::FieldNameSize => ErrorCode::LimitFieldNameSize,
        }
    }
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code().as_str())
    }
}

/// Domain-wide error type for the multipart ingestion pipeline.
///
/// Every fallible operation in this crate and its infrastructure adapters
/// returns `Result<_, PipelineError>`. Variants are grouped by the taxonomy
/// in the error handling design: framing errors, limit errors, plugin
/// errors, resource errors, and cancellation.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// The body did not conform to RFC 2046/7578 framing: no boundary,
    /// missing `Content-Disposition`, or the stream ended before a final
    /// delimiter was seen.
    #[error("framing error: {0}")]
    Framing(String),

    /// A configured quantitative limit was exceeded.
    #[error("limit exceeded: {kind} (configured {configured})")]
    LimitExceeded { kind: LimitKind, configured: u64 },

    /// A validator, transformer, or storage plugin rejected or failed on a
    /// file part.
    #[error("pipeline error: {0}")]
    Plugin(String),

    /// A transformer returned a context whose stream was null/invalid, or a
    /// part stream was read after being destroyed.
    #[error("invalid stream: {0}")]
    InvalidStream(String),

    /// An I/O or network failure from a storage driver.
    #[error("io error: {0}")]
    Io(String),

    /// A plugin or façade was misconfigured (missing required parameter,
    /// bad ordering, unknown storage kind).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The request was cancelled; cleanups still run, but no further bytes
    /// will be delivered.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A cleanup call on an already-settled pipeline, or other invariant
    /// violation that indicates a bug in this crate rather than bad input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Convenience constructor for a framing error.
    pub fn framing(msg: impl Into<String>) -> Self {
        Self::Framing(msg.into())
    }

    /// Convenience constructor for a plugin/pipeline failure.
    pub fn plugin(msg: impl Into<String>) -> Self {
        Self::Plugin(msg.into())
    }

    /// Convenience constructor for an I/O failure.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// The stable wire code for this error, used by `onError` observers and
    /// log fields instead of matching on the display message.
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::Framing(_) => ErrorCode::FramingError,
            PipelineError::LimitExceeded { kind, .. } => kind.code(),
            PipelineError::Plugin(_) => ErrorCode::PipelineError,
            PipelineError::InvalidStream(_) => ErrorCode::InvalidStream,
            PipelineError::Io(_) => ErrorCode::PipelineError,
            PipelineError::InvalidConfiguration(_) => ErrorCode::PipelineError,
            PipelineError::Cancelled(_) => ErrorCode::Cancelled,
            PipelineError::Internal(_) => ErrorCode::PipelineError,
        }
    }

    /// True for errors that a retry of the same request might not
    /// reproduce (resource/IO pressure), false for errors that are
    /// deterministic given the same input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Io(_))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}
