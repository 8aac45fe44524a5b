// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # S3 Storage
//!
//! Single-PUT upload (≤5 GiB) to an S3-compatible bucket via SigV4, using
//! `s3-simple` as the signer/client leaf dependency — not reimplemented
//! here, per the plugin contract's note that the signer is a leaf utility.
//!
//! A single PUT needs the whole body up front to sign `Content-Length`, so
//! unlike [`LocalFileStorage`](super::local_storage::LocalFileStorage) this
//! sink necessarily buffers one part in memory before upload; multipart S3
//! uploads for larger bodies are an explicit non-goal.

use adaptive_pipeline_domain::entities::{ProcessingContext, StorageDescriptor};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Deletable, Plugin, PluginKind};
use async_trait::async_trait;
use futures::stream::StreamExt;
use s3_simple::{Bucket, BucketOptions, Credentials, Region};
use tracing::debug;

/// Terminal storage sink that uploads to an S3-compatible bucket.
pub struct S3Storage {
    bucket: Bucket,
}

impl S3Storage {
    pub fn new(host: url::Url, bucket_name: String, region: Region, credentials: Credentials) -> Result<Self, PipelineError> {
        let bucket = Bucket::new(host, bucket_name, region, credentials, Some(BucketOptions::default()))
            .map_err(|err| PipelineError::InvalidConfiguration(err.to_string()))?;
        Ok(Self { bucket })
    }
}

#[async_trait]
impl Plugin for S3Storage {
    fn kind(&self) -> PluginKind {
        PluginKind::Storage
    }

    fn name(&self) -> &str {
        "s3-storage"
    }

    async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        let mut body = Vec::new();
        while let Some(item) = context.stream.next().await {
            let chunk = item?;
            body.extend_from_slice(&chunk);
        }
        let bytes_written = body.len() as u64;

        let key = format!("{}-{}", uuid::Uuid::new_v4(), context.file_info.filename());
        self.bucket
            .put_with_content_type(&key, &body, context.file_info.mime_type())
            .await
            .map_err(|err| PipelineError::io(err.to_string()))?;

        debug!(key = %key, bytes_written, "uploaded file part to s3");
        context.storage.push(StorageDescriptor { driver: "s3".to_string(), key, bytes_written });
        Ok(context)
    }

    async fn cleanup(&self, context: &ProcessingContext, _error: &PipelineError) {
        for descriptor in &context.storage {
            if descriptor.driver == "s3" {
                let _ = self.delete(&descriptor.key).await;
            }
        }
    }
}

#[async_trait]
impl Deletable for S3Storage {
    async fn delete(&self, key: &str) -> Result<(), PipelineError> {
        self.bucket.delete(key).await.map(|_| ()).map_err(|err| PipelineError::io(err.to_string()))
    }
}
