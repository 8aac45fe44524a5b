// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Part Headers Entity
//!
//! A case-insensitive mapping from header name to raw value for one
//! multipart part, as described in the data model's "Part headers" section.

use std::collections::BTreeMap;

/// Headers for one multipart part. Keys are always lowercase; callers should
/// look up with a lowercase name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    entries: BTreeMap<String, String>,
}

impl PartHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, overwriting any prior value for the same
    /// (already-lowercased) name.
    pub fn insert(&mut self, name: String, value: String) {
        self.entries.insert(name, value);
    }

    /// Looks up a header by lowercase name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// The declared `Content-Type`, defaulting to `application/octet-stream`
    /// as required for file parts without an explicit type.
    pub fn content_type_or_default(&self) -> &str {
        self.get("content-type").unwrap_or("application/octet-stream")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
