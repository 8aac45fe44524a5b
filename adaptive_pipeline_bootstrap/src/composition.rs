// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Composition Root
//!
//! Wires the concrete leaf plugins into a [`PluginChain`], builds a
//! [`MultipartService`], and drives one file from disk through it — a
//! runnable demonstration of the façade rather than a production HTTP
//! front end, which this workspace deliberately does not provide.

use adaptive_pipeline::application::services::{MultipartService, PluginChain};
use adaptive_pipeline::infrastructure::adapters::{LocalFileStorage, MimeSniffValidator, Sha256HashTransformer};
use adaptive_pipeline::infrastructure::config::Settings;
use adaptive_pipeline_domain::entities::AggregateResult;
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::value_objects::Boundary;
use bytes::Bytes;
use futures::stream;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::ValidatedCli;

/// Builds the plugin chain this demo CLI runs every file through: a
/// MIME-sniff validator permitting a small set of common document/image
/// types, a SHA-256 hash transformer, and local file storage under the
/// configured directory.
fn build_plugin_chain(storage_dir: &Path) -> PluginChain {
    PluginChain {
        validators: vec![Arc::new(MimeSniffValidator::new(vec![
            "image/png".to_string(),
            "image/jpeg".to_string(),
            "image/gif".to_string(),
            "application/pdf".to_string(),
        ]))],
        transformers: vec![Arc::new(Sha256HashTransformer::new())],
        storages: vec![Arc::new(LocalFileStorage::new(storage_dir))],
    }
}

/// Reads `cli.input` in full and ingests it as one `multipart/form-data`
/// request body, using `cli.boundary` as the wire boundary token.
///
/// This is a demo entry point, not a streaming HTTP handler: it buffers the
/// whole input file before handing it to the parser, since there is no
/// inbound connection here to stream from. The parser and pipeline
/// downstream of that point still process the body incrementally.
pub async fn run_ingestion(cli: &ValidatedCli) -> Result<AggregateResult, PipelineError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let chain = build_plugin_chain(&cli.storage_dir);
    let service = MultipartService::new(chain);
    let boundary = Boundary::new(cli.boundary.clone().into_bytes())?;

    let bytes = read_input(&cli.input).await?;
    let source = stream::iter(vec![Ok::<Bytes, PipelineError>(bytes)]);

    info!(input = %cli.input.display(), storage_dir = %cli.storage_dir.display(), "starting ingestion");
    let result = service.ingest(source, boundary, settings.limits, None).await?;

    info!(
        fields = result.fields.len(),
        files = result.files.len(),
        "ingestion complete"
    );
    for file in &result.files {
        match &file.outcome {
            Ok(descriptors) => {
                for descriptor in descriptors {
                    info!(
                        field = file.file_info.field_name(),
                        driver = %descriptor.driver,
                        key = %descriptor.key,
                        bytes = descriptor.bytes_written,
                        "file stored"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(field = file.file_info.field_name(), error = %err, "file pipeline failed");
            }
        }
    }

    Ok(result)
}

async fn read_input(path: &Path) -> Result<Bytes, PipelineError> {
    let bytes = tokio::fs::read(path).await.map_err(PipelineError::from)?;
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn runs_a_simple_field_only_body_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("body.bin");
        tokio::fs::write(&input_path, b"--B\r\nContent-Disposition: form-data; name=\"u\"\r\n\r\njohn\r\n--B--\r\n")
            .await
            .unwrap();

        let cli = ValidatedCli {
            input: input_path,
            boundary: "B".to_string(),
            storage_dir: dir.path().join("uploads"),
            config: None,
            verbose: false,
        };

        let result = run_ingestion(&cli).await.unwrap();
        assert_eq!(result.fields.len(), 1);
        assert!(result.files.is_empty());
    }

    #[tokio::test]
    async fn reports_framing_error_for_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("body.bin");
        tokio::fs::write(&input_path, b"not a multipart body").await.unwrap();

        let cli = ValidatedCli {
            input: input_path,
            boundary: "B".to_string(),
            storage_dir: PathBuf::from("./uploads"),
            config: None,
            verbose: false,
        };

        let err = run_ingestion(&cli).await.unwrap_err();
        assert!(matches!(err, PipelineError::Framing(_)));
    }
}
