// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Boundary Value Object
//!
//! Represents the `multipart/form-data` boundary token chosen by the sender,
//! together with the two derived patterns the parser actually searches for:
//! the inline delimiter (`CRLF--<boundary>`) and the leading delimiter
//! (`--<boundary>`).
//!
//! ## Design Principles
//!
//! - **Value Object**: a `Boundary` is compared and hashed by its bytes.
//! - **Validated at construction**: only valid RFC 2046 boundary tokens (1-70
//!   ASCII octets) can be built; invalid tokens fail at the edge, not deep in
//!   the scanner.
//! - **Pattern derivation is a pure function of the token**: no parser state
//!   leaks into this type.

use crate::error::PipelineError;

/// Maximum length of a boundary token per RFC 2046.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// The boundary token negotiated for one request, plus its derived search
/// patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    token: Vec<u8>,
    inline_delimiter: Vec<u8>,
    leading_delimiter: Vec<u8>,
    final_delimiter: Vec<u8>,
}

impl Boundary {
    /// Builds a `Boundary` from a raw token (already unquoted), validating
    /// length and character set per RFC 2046.
    pub fn new(token: impl Into<Vec<u8>>) -> Result<Self, PipelineError> {
        let token = token.into();
        if token.is_empty() || token.len() > MAX_BOUNDARY_LEN {
            return Err(PipelineError::framing(format!(
                "boundary token length {} out of range 1..={}",
                token.len(),
                MAX_BOUNDARY_LEN
            )));
        }
        if !token.iter().all(|&b| b.is_ascii() && b != b'\r' && b != b'\n') {
            return Err(PipelineError::framing("boundary token contains invalid bytes"));
        }

        let mut inline_delimiter = Vec::with_capacity(token.len() + 4);
        inline_delimiter.extend_from_slice(b"\r\n--");
        inline_delimiter.extend_from_slice(&token);

        let mut leading_delimiter = Vec::with_capacity(token.len() + 2);
        leading_delimiter.extend_from_slice(b"--");
        leading_delimiter.extend_from_slice(&token);

        let mut final_delimiter = inline_delimiter.clone();
        final_delimiter.extend_from_slice(b"--");

        Ok(Self {
            token,
            inline_delimiter,
            leading_delimiter,
            final_delimiter,
        })
    }

    /// Parses a boundary out of a `Content-Type` header value, e.g.
    /// `multipart/form-data; boundary="----WebKitFormBoundary..."`.
    ///
    /// Accepts both quoted and unquoted boundary parameters. Fails with a
    /// framing error if the header isn't `multipart/form-data` or carries no
    /// boundary parameter.
    pub fn parse_content_type(content_type: &str) -> Result<Self, PipelineError> {
        let mut parts = content_type.split(';');
        let media_type = parts.next().unwrap_or("").trim();
        if !media_type.eq_ignore_ascii_case("multipart/form-data") {
            return Err(PipelineError::framing(format!(
                "unsupported content type: {media_type}"
            )));
        }

        for param in parts {
            let param = param.trim();
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("boundary") {
                continue;
            }
            let value = value.trim();
            let unquoted = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                &value[1..value.len() - 1]
            } else {
                value
            };
            return Boundary::new(unquoted.as_bytes());
        }

        Err(PipelineError::framing("content type has no boundary parameter"))
    }

    /// The raw boundary token, e.g. `----WebKitFormBoundary...`.
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// `CRLF--<boundary>`, the pattern searched for inside a part's body.
    pub fn inline_delimiter(&self) -> &[u8] {
        &self.inline_delimiter
    }

    /// `--<boundary>`, the pattern expected at the very start of the body
    /// (before any part has been seen).
    pub fn leading_delimiter(&self) -> &[u8] {
        &self.leading_delimiter
    }

    /// `CRLF--<boundary>--`, the pattern that marks the end of the body.
    pub fn final_delimiter(&self) -> &[u8] {
        &self.final_delimiter
    }
}
