// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Info Entity
//!
//! An immutable record describing one file part, handed to the consumer
//! alongside its part stream. Mirrors the "File info" entry in the data
//! model: field name, filename, declared MIME type, and headers.

use crate::entities::part_headers::PartHeaders;

/// Immutable per-file-part metadata, available the moment the part's stream
/// is handed to the pipeline manager (before any body bytes flow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    field_name: String,
    filename: String,
    mime_type: String,
    headers: PartHeaders,
}

impl FileInfo {
    pub fn new(field_name: impl Into<String>, filename: impl Into<String>, headers: PartHeaders) -> Self {
        let mime_type = headers.content_type_or_default().to_string();
        Self {
            field_name: field_name.into(),
            filename: filename.into(),
            mime_type,
            headers,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The declared MIME type (from `Content-Type`, or the default). This is
    /// the sender's claim, distinct from any MIME sniffed from content by a
    /// validator.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }
}
