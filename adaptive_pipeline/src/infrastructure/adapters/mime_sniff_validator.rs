// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # MIME Sniff Validator
//!
//! Inspects the first bytes of a file part against a small magic-byte table
//! and rejects the part unless the sniffed type is on the configured
//! allow-list. Buffers only as many bytes as the longest magic number needs
//! before making a decision, then replays the buffered prefix ahead of the
//! rest of the stream.

use adaptive_pipeline_domain::entities::ProcessingContext;
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Plugin, PluginKind};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;

/// One magic-number row: the byte signature and the MIME type it implies.
struct MagicEntry {
    signature: &'static [u8],
    mime_type: &'static str,
}

const MAGIC_TABLE: &[MagicEntry] = &[
    MagicEntry { signature: b"\x89PNG\r\n\x1a\n", mime_type: "image/png" },
    MagicEntry { signature: b"\xff\xd8\xff", mime_type: "image/jpeg" },
    MagicEntry { signature: b"GIF87a", mime_type: "image/gif" },
    MagicEntry { signature: b"GIF89a", mime_type: "image/gif" },
    MagicEntry { signature: b"%PDF-", mime_type: "application/pdf" },
];

fn longest_signature() -> usize {
    MAGIC_TABLE.iter().map(|e| e.signature.len()).max().unwrap_or(0)
}

fn sniff(prefix: &[u8]) -> Option<&'static str> {
    MAGIC_TABLE
        .iter()
        .find(|entry| prefix.starts_with(entry.signature))
        .map(|entry| entry.mime_type)
}

/// Rejects a file part whose sniffed content type is not in `allowed`.
pub struct MimeSniffValidator {
    allowed: Vec<String>,
}

impl MimeSniffValidator {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }
}

#[async_trait]
impl Plugin for MimeSniffValidator {
    fn kind(&self) -> PluginKind {
        PluginKind::Validator
    }

    fn name(&self) -> &str {
        "mime-sniff-validator"
    }

    async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        let prefix_len = longest_signature();
        let mut stream = context.stream;
        let mut prefix = BytesMut::with_capacity(prefix_len);
        let mut exhausted = false;

        while prefix.len() < prefix_len {
            match stream.next().await {
                Some(Ok(chunk)) => prefix.extend_from_slice(&chunk),
                Some(Err(err)) => return Err(err),
                None => {
                    exhausted = true;
                    break;
                }
            }
        }

        let sniffed = sniff(&prefix).unwrap_or("application/octet-stream");
        if !self.allowed.iter().any(|m| m == sniffed) {
            return Err(PipelineError::plugin(format!("sniffed mime type {sniffed} not allowed")));
        }

        let prefix = prefix.freeze();
        let wrapped = async_stream::stream! {
            if !prefix.is_empty() {
                yield Ok::<Bytes, PipelineError>(prefix);
            }
            if !exhausted {
                let mut stream = stream;
                while let Some(item) = stream.next().await {
                    yield item;
                }
            }
        };
        context.replace_stream(Box::pin(wrapped))?;
        Ok(context)
    }
}
