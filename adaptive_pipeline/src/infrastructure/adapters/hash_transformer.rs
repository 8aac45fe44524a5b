// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SHA-256 Hash Transformer
//!
//! Computes an incremental SHA-256 digest as the stream passes through
//! unchanged, publishing the hex digest into `metadata` once the stream is
//! exhausted. Because the digest is only known at end-of-stream, and
//! `process` must return long before the stream is actually drained by a
//! downstream sink, the write goes through [`Metadata`]'s shared backing
//! map rather than a field on a context nobody still owns by then.

use adaptive_pipeline_domain::entities::{MetadataValue, ProcessingContext};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Plugin, PluginKind};
use async_trait::async_trait;
use futures::stream::StreamExt;
use sha2::{Digest, Sha256};

const METADATA_KEY: &str = "sha256";

/// Streams bytes through unchanged, publishing `metadata["sha256"]` as a hex
/// string once the wrapped stream is fully consumed.
pub struct Sha256HashTransformer;

impl Sha256HashTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Sha256HashTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for Sha256HashTransformer {
    fn kind(&self) -> PluginKind {
        PluginKind::Transformer
    }

    fn name(&self) -> &str {
        "sha256-hash-transformer"
    }

    async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        let stream = context.stream;
        let metadata = context.metadata.clone();
        let wrapped = async_stream::stream! {
            let mut stream = stream;
            let mut hasher = Sha256::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        hasher.update(&bytes);
                        yield Ok(bytes);
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
            let digest = hex::encode(hasher.finalize());
            metadata.set(METADATA_KEY, MetadataValue::Text(digest));
        };
        context.replace_stream(Box::pin(wrapped))?;
        Ok(context)
    }
}
