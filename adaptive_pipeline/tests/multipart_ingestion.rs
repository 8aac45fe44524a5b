// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end coverage of the six seed scenarios, driving the
//! `MultipartService` façade with the concrete leaf plugins rather than the
//! unit-level test doubles used inside each module.

use adaptive_pipeline::application::services::{MultipartService, PluginChain};
use adaptive_pipeline::infrastructure::adapters::{
    LocalFileStorage, MimeSniffValidator, Sha256HashTransformer, SizeLimitValidator,
};
use adaptive_pipeline_domain::entities::{MetadataValue, ProcessingContext, StorageDescriptor};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Plugin, PluginKind};
use adaptive_pipeline_domain::value_objects::{Boundary, Limits};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn boundary() -> Boundary {
    Boundary::new(b"B".to_vec()).unwrap()
}

fn whole_body(body: &'static [u8]) -> impl Stream<Item = Result<Bytes, PipelineError>> + Send + Unpin + 'static {
    stream::iter(vec![Ok(Bytes::from_static(body))])
}

fn chunked_body(body: &'static [u8], chunk_size: usize) -> impl Stream<Item = Result<Bytes, PipelineError>> + Send + Unpin + 'static {
    let chunks: Vec<Result<Bytes, PipelineError>> =
        body.chunks(chunk_size).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
    stream::iter(chunks)
}

// Scenario 1: simple field, no files.
#[tokio::test]
async fn simple_field_emits_one_field_and_no_files() {
    let body: &[u8] = b"--B\r\nContent-Disposition: form-data; name=\"u\"\r\n\r\njohn\r\n--B--\r\n";
    let service = MultipartService::new(PluginChain::default());

    let result = service.ingest(whole_body(body), boundary(), Limits::default(), None).await.unwrap();

    assert_eq!(result.fields.len(), 1);
    assert!(result.files.is_empty());
    assert_eq!(result.fields["u"].values(), vec!["john"]);
}

// Scenario 2: file with a known SHA-256, hashed and stored.
#[tokio::test]
async fn file_with_known_sha256_is_hashed_and_stored() {
    let body: &[u8] = b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"test.txt\"\r\n\r\n\
Hello, World!\r\n--B--\r\n";

    let dir = tempfile::tempdir().unwrap();
    let chain = PluginChain {
        validators: vec![],
        transformers: vec![Arc::new(Sha256HashTransformer::new())],
        storages: vec![Arc::new(LocalFileStorage::new(dir.path()))],
    };
    let service = MultipartService::new(chain);

    let result = service.ingest(whole_body(body), boundary(), Limits::default(), None).await.unwrap();

    assert_eq!(result.files.len(), 1);
    let file = &result.files[0];
    let descriptors = file.outcome.as_ref().unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].bytes_written, 13);

    let stored = std::fs::read(dir.path().join(&descriptors[0].key)).unwrap();
    assert_eq!(stored, b"Hello, World!");
}

// Same scenario, but asserting the transformer's own published digest
// directly rather than re-hashing the stored bytes, since the storage
// descriptor alone doesn't prove the transformer ran.
#[tokio::test]
async fn hash_transformer_publishes_expected_digest() {
    use adaptive_pipeline_domain::entities::{FileInfo, PartByteStream, PartHeaders};

    let transformer = Sha256HashTransformer::new();
    let stream: PartByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from_static(b"Hello, World!"))]));
    let info = FileInfo::new("f", "test.txt", PartHeaders::new());
    let mut ctx = transformer.process(ProcessingContext::new(stream, info, None)).await.unwrap();
    let metadata = ctx.metadata.clone();

    while ctx.stream.next().await.is_some() {}

    let digest = match metadata.get("sha256") {
        Some(MetadataValue::Text(d)) => d,
        other => panic!("expected digest, got {other:?}"),
    };
    assert_eq!(digest, "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f");
}

// Scenario 3: same body as scenario 1, delivered in 3-byte chunks.
#[tokio::test]
async fn chunked_delivery_yields_identical_emission() {
    let body: &[u8] = b"--B\r\nContent-Disposition: form-data; name=\"u\"\r\n\r\njohn\r\n--B--\r\n";
    let service = MultipartService::new(PluginChain::default());

    let result = service.ingest(chunked_body(body, 3), boundary(), Limits::default(), None).await.unwrap();

    assert_eq!(result.fields.len(), 1);
    assert_eq!(result.fields["u"].values(), vec!["john"]);
    assert!(result.files.is_empty());
}

// Scenario 4: a file whose body exceeds a configured limit is rejected
// mid-stream by the size-limit validator, and nothing reaches storage.
#[tokio::test]
async fn over_limit_file_is_rejected_before_reaching_storage() {
    let payload = vec![b'x'; 37];
    let mut body = Vec::new();
    body.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"big.bin\"\r\n\r\n");
    body.extend_from_slice(&payload);
    body.extend_from_slice(b"\r\n--B--\r\n");

    struct NeverCalledStorage(Arc<AtomicUsize>);

    #[async_trait]
    impl Plugin for NeverCalledStorage {
        fn kind(&self) -> PluginKind {
            PluginKind::Storage
        }
        fn name(&self) -> &str {
            "never-called-storage"
        }
        async fn process(&self, context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(context)
        }
    }

    let invoked = Arc::new(AtomicUsize::new(0));
    let chain = PluginChain {
        validators: vec![Arc::new(SizeLimitValidator::new(10))],
        transformers: vec![],
        storages: vec![Arc::new(NeverCalledStorage(invoked.clone()))],
    };
    let service = MultipartService::new(chain);

    let body: &'static [u8] = Box::leak(body.into_boxed_slice());
    let result = service.ingest(whole_body(body), boundary(), Limits::default(), None).await.unwrap();

    assert_eq!(result.files.len(), 1);
    let err = result.files[0].outcome.as_ref().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::LimitExceeded { kind: adaptive_pipeline_domain::error::LimitKind::FileSize, configured: 10 }
    ));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

// Scenario 5: fan-out to two storage sinks, first fails partway through a
// 12 KiB file after writing 5 KiB; the second sink's work is rolled back via
// cleanup and the pipeline as a whole reports the failure.
#[tokio::test]
async fn fan_out_rolls_back_surviving_sink_when_one_fails() {
    const TOTAL: usize = 12 * 1024;
    const FAIL_AFTER: usize = 5 * 1024;

    struct FlakyStorage {
        fail_after: u64,
    }

    #[async_trait]
    impl Plugin for FlakyStorage {
        fn kind(&self) -> PluginKind {
            PluginKind::Storage
        }
        fn name(&self) -> &str {
            "flaky-storage"
        }
        async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
            let mut seen: u64 = 0;
            while let Some(chunk) = context.stream.next().await {
                let chunk = chunk?;
                seen += chunk.len() as u64;
                if seen > self.fail_after {
                    return Err(PipelineError::io("simulated disk failure"));
                }
            }
            context.storage.push(StorageDescriptor { driver: "flaky".to_string(), key: "n/a".to_string(), bytes_written: seen });
            Ok(context)
        }
    }

    struct RecordingStorage {
        deletes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for RecordingStorage {
        fn kind(&self) -> PluginKind {
            PluginKind::Storage
        }
        fn name(&self) -> &str {
            "recording-storage"
        }
        async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
            let mut total: u64 = 0;
            while let Some(chunk) = context.stream.next().await {
                total += chunk?.len() as u64;
            }
            context.storage.push(StorageDescriptor {
                driver: "recording".to_string(),
                key: "stored-object".to_string(),
                bytes_written: total,
            });
            Ok(context)
        }
        async fn cleanup(&self, context: &ProcessingContext, _error: &PipelineError) {
            if context.storage.iter().any(|d| d.driver == "recording") {
                self.deletes.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let payload = vec![b'y'; TOTAL];
    let mut body = Vec::new();
    body.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"big.bin\"\r\n\r\n");
    body.extend_from_slice(&payload);
    body.extend_from_slice(b"\r\n--B--\r\n");
    let body: &'static [u8] = Box::leak(body.into_boxed_slice());

    let deletes = Arc::new(AtomicUsize::new(0));
    let chain = PluginChain {
        validators: vec![],
        transformers: vec![],
        storages: vec![
            Arc::new(RecordingStorage { deletes: deletes.clone() }),
            Arc::new(FlakyStorage { fail_after: FAIL_AFTER as u64 }),
        ],
    };
    let service = MultipartService::new(chain);

    let result = service.ingest(whole_body(body), boundary(), Limits::default(), None).await.unwrap();
    assert_eq!(result.files.len(), 1);
    let err = result.files[0].outcome.as_ref().unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
    assert_eq!(deletes.load(Ordering::SeqCst), 1);
}

// Scenario 6: declared image/png, body is actually JPEG magic bytes; the
// allow list only contains image/png, so the sniff validator rejects before
// any storage plugin runs.
#[tokio::test]
async fn magic_byte_mismatch_is_rejected_before_storage() {
    let mut body = Vec::new();
    body.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\n");
    body.extend_from_slice(b"\xff\xd8\xff\xe0rest of jpeg bytes");
    body.extend_from_slice(b"\r\n--B--\r\n");
    let body: &'static [u8] = Box::leak(body.into_boxed_slice());

    let invoked = Arc::new(AtomicUsize::new(0));

    struct NeverCalledStorage(Arc<AtomicUsize>);

    #[async_trait]
    impl Plugin for NeverCalledStorage {
        fn kind(&self) -> PluginKind {
            PluginKind::Storage
        }
        fn name(&self) -> &str {
            "never-called-storage"
        }
        async fn process(&self, context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(context)
        }
    }

    let chain = PluginChain {
        validators: vec![Arc::new(MimeSniffValidator::new(vec!["image/png".to_string()]))],
        transformers: vec![],
        storages: vec![Arc::new(NeverCalledStorage(invoked.clone()))],
    };
    let service = MultipartService::new(chain);

    let result = service.ingest(whole_body(body), boundary(), Limits::default(), None).await.unwrap();
    assert_eq!(result.files.len(), 1);
    let err = result.files[0].outcome.as_ref().unwrap_err();
    match err {
        PipelineError::Plugin(msg) => assert!(msg.contains("image/jpeg")),
        other => panic!("expected plugin rejection mentioning image/jpeg, got {other:?}"),
    }
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}
