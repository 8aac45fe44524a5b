// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local File Storage
//!
//! Writes a part's stream to a file under a configured directory, one
//! write per incoming chunk so the whole file is never held in memory at
//! once. The stored key is a UUID-derived filename, not the client-supplied
//! filename, so path traversal in `FileInfo::filename` can't escape the
//! configured directory.

use adaptive_pipeline_domain::entities::{ProcessingContext, StorageDescriptor};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Deletable, Plugin, PluginKind};
use async_trait::async_trait;
use futures::stream::StreamExt;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Terminal storage sink that writes to `directory`.
pub struct LocalFileStorage {
    directory: PathBuf,
}

impl LocalFileStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }
}

#[async_trait]
impl Plugin for LocalFileStorage {
    fn kind(&self) -> PluginKind {
        PluginKind::Storage
    }

    fn name(&self) -> &str {
        "local-file-storage"
    }

    async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        fs::create_dir_all(&self.directory).await?;

        let key = format!("{}-{}", uuid::Uuid::new_v4(), context.file_info.field_name());
        let path = self.path_for(&key);
        let mut file = fs::File::create(&path).await?;
        let mut bytes_written: u64 = 0;

        while let Some(item) = context.stream.next().await {
            let chunk = item?;
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(path = %path.display(), bytes_written, "wrote file part to local storage");
        context.storage.push(StorageDescriptor { driver: "local".to_string(), key, bytes_written });
        Ok(context)
    }

    async fn cleanup(&self, context: &ProcessingContext, _error: &PipelineError) {
        for descriptor in &context.storage {
            if descriptor.driver == "local" {
                let _ = self.delete(&descriptor.key).await;
            }
        }
    }
}

#[async_trait]
impl Deletable for LocalFileStorage {
    async fn delete(&self, key: &str) -> Result<(), PipelineError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
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
        let info = FileInfo::new("upload", "a.bin", PartHeaders::new());
        ProcessingContext::new(stream, info, None)
    }

    #[tokio::test]
    async fn writes_stream_and_returns_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let ctx = storage.process(context_with(vec![b"hello", b" world"])).await.unwrap();

        assert_eq!(ctx.storage.len(), 1);
        let descriptor = &ctx.storage[0];
        assert_eq!(descriptor.driver, "local");
        assert_eq!(descriptor.bytes_written, 11);

        let contents = std::fs::read(dir.path().join(&descriptor.key)).unwrap();
        assert_eq!(contents, b"hello world");
    }

    #[tokio::test]
    async fn delete_removes_the_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let ctx = storage.process(context_with(vec![b"x"])).await.unwrap();
        let key = ctx.storage[0].key.clone();

        storage.delete(&key).await.unwrap();
        assert!(!dir.path().join(&key).exists());
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        storage.delete("does-not-exist").await.unwrap();
    }
}
