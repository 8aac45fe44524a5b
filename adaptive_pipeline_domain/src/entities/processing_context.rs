// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processing Context Entity
//!
//! The object threaded through one file's pipeline, from the source stream
//! handed out by the parser through every validator, transformer, and
//! storage sink. See the data model's "Context" section.

use crate::entities::file_info::FileInfo;
use crate::error::PipelineError;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream};
use std::collections::HashMap;
use uuid::Uuid;

/// The lazy byte stream threaded through a pipeline. Each stage either
/// passes this through unchanged (validators observe, possibly wrapping with
/// a pass-through that can fail mid-stream) or replaces it with a new
/// wrapping stream (transformers).
pub type PartByteStream = BoxStream<'static, Result<Bytes, PipelineError>>;

/// A typed metadata value. Plugins publish observations (hash digest,
/// detected MIME, image dimensions) under a string key; typing the value
/// avoids downstream consumers needing to downcast an `Any`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Bytes(Vec<u8>),
    Text(String),
    Number(f64),
    Bool(bool),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// A mapping that only grows: keys may be inserted or overwritten, but the
/// set of keys set by an earlier plugin is never visible as "removed" to a
/// later one (invariant 5 in the data model). Enforced structurally by
/// exposing no removal method.
///
/// Backed by `Arc<Mutex<_>>` rather than a bare map: a transformer that
/// wraps the stream (e.g. the hash transformer) only knows a chunk's digest
/// once the stream is fully drained, which may happen well after `process`
/// has returned this `Metadata` to the manager. Cloning shares the same
/// underlying map, so a side-channel write made while the stream drains is
/// visible through every clone taken earlier in the pipeline, matching the
/// "publish into the shared metadata mapping through an event channel"
/// design note rather than mutating a field nobody still holds.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: std::sync::Arc<std::sync::Mutex<HashMap<String, MetadataValue>>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: MetadataValue) {
        self.entries.lock().expect("metadata mutex poisoned").insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<MetadataValue> {
        self.entries.lock().expect("metadata mutex poisoned").get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().expect("metadata mutex poisoned").keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("metadata mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().expect("metadata mutex poisoned").is_empty()
    }
}

/// Caller identity, for plugins that need to scope state to the originating
/// request (CSRF tokens, per-client rate limiting). Deliberately
/// transport-agnostic: this crate has no HTTP framing opinion.
#[derive(Debug, Clone, Default)]
pub struct RequestHandle {
    pub request_id: Option<Uuid>,
    pub remote_key: Option<String>,
    pub claims: HashMap<String, String>,
}

/// A terminal sink's result descriptor, populated once storage succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDescriptor {
    /// Name of the storage driver that produced this descriptor (e.g.
    /// `"local"`, `"s3"`), useful when fan-out is configured.
    pub driver: String,
    /// An opaque key/path/URL identifying the stored object, sufficient to
    /// pass to that driver's `delete` for rollback.
    pub key: String,
    pub bytes_written: u64,
}

/// The object threaded through a single file's pipeline.
pub struct ProcessingContext {
    pub stream: PartByteStream,
    pub file_info: FileInfo,
    pub metadata: Metadata,
    pub request: Option<RequestHandle>,
    pub storage: Vec<StorageDescriptor>,
}

impl ProcessingContext {
    pub fn new(stream: PartByteStream, file_info: FileInfo, request: Option<RequestHandle>) -> Self {
        Self {
            stream,
            file_info,
            metadata: Metadata::new(),
            request,
            storage: Vec::new(),
        }
    }

    /// Replaces the stream, as a transformer does. A stream whose
    /// `size_hint` statically proves it yields nothing (e.g.
    /// `futures::stream::empty()`) is rejected with
    /// [`PipelineError::InvalidStream`] rather than silently installed, per
    /// the rule that a transformer's result must carry a non-null stream.
    pub fn replace_stream(&mut self, stream: PartByteStream) -> Result<(), PipelineError> {
        if stream.size_hint() == (0, Some(0)) {
            return Err(PipelineError::InvalidStream(
                "transformer replaced the stream with one statically known to be empty".to_string(),
            ));
        }
        self.stream = stream;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::file_info::FileInfo;
    use crate::entities::part_headers::PartHeaders;
    use futures::stream::{self, StreamExt};

    fn test_context() -> ProcessingContext {
        let stream: PartByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from_static(b"x"))]));
        ProcessingContext::new(stream, FileInfo::new("f", "a.bin", PartHeaders::new()), None)
    }

    #[test]
    fn replace_stream_rejects_statically_empty_stream() {
        let mut context = test_context();
        let empty: PartByteStream = Box::pin(stream::empty());
        let err = context.replace_stream(empty).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStream(_)));
    }

    #[test]
    fn replace_stream_accepts_a_real_stream() {
        let mut context = test_context();
        let replacement: PartByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from_static(b"y"))]));
        context.replace_stream(replacement).unwrap();
        let collected: Vec<_> = futures::executor::block_on(context.stream.collect());
        assert_eq!(collected.len(), 1);
    }
}
