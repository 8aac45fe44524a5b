// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Multipart Service
//!
//! The framework façade (component design §4, component E): instantiates
//! the parser against a configured boundary and limits, dispatches field
//! events straight into the aggregate result, hands each file event to the
//! pipeline manager, and waits for every pipeline to settle before
//! returning.
//!
//! ## Anti-pattern avoided
//!
//! Each file's pipeline task is spawned as soon as its `ParserEvent::File`
//! is observed — not queued behind an async initializer whose rejection
//! could be lost. `tokio::spawn` starts the future running immediately;
//! the handle is collected and only awaited afterward, so a pipeline that
//! fails a microsecond after spawning still reports through its `JoinHandle`
//! rather than disappearing.

use adaptive_pipeline_domain::entities::{AggregateResult, FileResult, ParserEvent, ProcessingContext, RequestHandle};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::Plugin;
use adaptive_pipeline_domain::value_objects::{Boundary, Limits};
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::infrastructure::parser::parse_multipart;
use crate::infrastructure::runtime::pipeline_manager;

/// The configured set of plugins a request's file parts are run through.
#[derive(Clone, Default)]
pub struct PluginChain {
    pub validators: Vec<Arc<dyn Plugin>>,
    pub transformers: Vec<Arc<dyn Plugin>>,
    pub storages: Vec<Arc<dyn Plugin>>,
}

/// Ingests one `multipart/form-data` request body end to end.
pub struct MultipartService {
    plugins: PluginChain,
}

impl MultipartService {
    pub fn new(plugins: PluginChain) -> Self {
        Self { plugins }
    }

    /// Drives `source` through the parser and every file's pipeline,
    /// returning once the parser has finished *and* every spawned pipeline
    /// has settled.
    #[instrument(skip(self, source), fields(boundary_len = boundary.token().len()))]
    pub async fn ingest<S>(
        &self,
        source: S,
        boundary: Boundary,
        limits: Limits,
        request: Option<RequestHandle>,
    ) -> Result<AggregateResult, PipelineError>
    where
        S: Stream<Item = Result<Bytes, PipelineError>> + Send + Unpin + 'static,
    {
        let mut events = parse_multipart(source, boundary, limits);
        let mut result = AggregateResult::new();
        let mut pipelines = Vec::new();
        let mut terminal_error: Option<PipelineError> = None;

        while let Some(event) = events.next().await {
            match event {
                ParserEvent::Field(name, value) => {
                    result.push_field(name, value);
                }
                ParserEvent::File(file_info, stream) => {
                    let context = ProcessingContext::new(stream, file_info.clone(), request.clone());
                    let validators = self.plugins.validators.clone();
                    let transformers = self.plugins.transformers.clone();
                    let storages = self.plugins.storages.clone();
                    let handle = tokio::spawn(async move {
                        let outcome = pipeline_manager::run(context, &validators, &transformers, &storages).await;
                        (file_info, outcome)
                    });
                    pipelines.push(handle);
                }
                ParserEvent::Limit(kind, configured) => {
                    warn!(%kind, configured, "configured limit exceeded during parse");
                }
                ParserEvent::Finish => {
                    info!(fields = result.fields.len(), files = pipelines.len(), "request body fully parsed");
                }
                ParserEvent::Error(err) => {
                    terminal_error = Some(err);
                    break;
                }
            }
        }

        for handle in pipelines {
            match handle.await {
                Ok((file_info, outcome)) => {
                    result.push_file(FileResult { file_info, outcome });
                }
                Err(join_error) => {
                    warn!(error = %join_error, "file pipeline task panicked or was cancelled");
                }
            }
        }

        if let Some(err) = terminal_error {
            return Err(err);
        }
        Ok(result)
    }
}
