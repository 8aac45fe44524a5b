// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Size Limit Validator
//!
//! Enforces a per-file byte cap on the stream as it passes through, mirroring
//! the size-limiter row in the plugin contract's failure semantics table.
//! Unlike the parser's own `limits.file_size` (which counts header-declared
//! expectations aren't available mid-stream), this validator counts actual
//! bytes observed and fails the stream the moment the running total crosses
//! the configured cap — it does not wait for end-of-stream.

use adaptive_pipeline_domain::entities::ProcessingContext;
use adaptive_pipeline_domain::error::{LimitKind, PipelineError};
use adaptive_pipeline_domain::services::{Plugin, PluginKind};
use async_trait::async_trait;
use futures::stream::StreamExt;

/// Rejects a file part once its observed byte count exceeds `max_bytes`.
pub struct SizeLimitValidator {
    max_bytes: u64,
}

impl SizeLimitValidator {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

#[async_trait]
impl Plugin for SizeLimitValidator {
    fn kind(&self) -> PluginKind {
        PluginKind::Validator
    }

    fn name(&self) -> &str {
        "size-limit-validator"
    }

    async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        let max_bytes = self.max_bytes;
        let stream = context.stream;
        let wrapped = async_stream::stream! {
            let mut stream = stream;
            let mut seen: u64 = 0;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        seen += bytes.len() as u64;
                        if seen > max_bytes {
                            yield Err(PipelineError::LimitExceeded { kind: LimitKind::FileSize, configured: max_bytes });
                            return;
                        }
                        yield Ok(bytes);
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        };
        context.replace_stream(Box::pin(wrapped))?;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_pipeline_domain::entities::{FileInfo, PartByteStream, PartHeaders};
    use bytes::Bytes;
    use futures::stream;

    fn context_with(chunks: Vec<&'static [u8]>) -> ProcessingContext {
        let stream: PartByteStream = Box::pin(stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c)))));
        let info = FileInfo::new("f", "a.bin", PartHeaders::new());
        ProcessingContext::new(stream, info, None)
    }

    #[tokio::test]
    async fn passes_under_limit() {
        let validator = SizeLimitValidator::new(10);
        let mut ctx = validator.process(context_with(vec![b"hello"])).await.unwrap();
        let mut total = Vec::new();
        while let Some(chunk) = ctx.stream.next().await {
            total.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(total, b"hello");
    }

    #[tokio::test]
    async fn rejects_once_total_exceeds_limit() {
        let validator = SizeLimitValidator::new(3);
        let mut ctx = validator.process(context_with(vec![b"ab", b"cd"])).await.unwrap();
        let first = ctx.stream.next().await.unwrap();
        assert!(first.is_ok());
        let second = ctx.stream.next().await.unwrap();
        assert!(matches!(second, Err(PipelineError::LimitExceeded { kind: LimitKind::FileSize, .. })));
    }
}
