// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Manager
//!
//! The composition engine from component design §4.3: for one file part,
//! threads `stream = source → validators → transformers → storage(s)`,
//! tracks which plugins actually ran so a failure can unwind them in
//! reverse, and fans a stream out to more than one storage sink when
//! configured.
//!
//! ## Cleanup context
//!
//! [`Plugin::process`](adaptive_pipeline_domain::services::Plugin::process)
//! consumes the [`ProcessingContext`] it's given and only returns it on
//! success, so a failing call leaves the manager with no live context to
//! hand `cleanup` (its stream included, which generally isn't restorable
//! after an error anyway). The manager instead mirrors the
//! `file_info`/`metadata`/`storage` fields after every successful stage and
//! reconstructs a cleanup-only context — stream replaced with an empty one,
//! since no plugin's `cleanup` implementation needs to read further bytes —
//! from that mirror when a later stage fails.

use crate::infrastructure::runtime::tee::tee;
use adaptive_pipeline_domain::entities::{FileInfo, Metadata, ProcessingContext, RequestHandle, StorageDescriptor};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::Plugin;
use futures::stream;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs one file part through the configured validator, transformer, and
/// storage plugins, in that order. Storage plugins run concurrently when
/// more than one is configured (fan-out via [`tee`]).
pub async fn run(
    mut context: ProcessingContext,
    validators: &[Arc<dyn Plugin>],
    transformers: &[Arc<dyn Plugin>],
    storages: &[Arc<dyn Plugin>],
) -> Result<Vec<StorageDescriptor>, PipelineError> {
    let file_info = context.file_info.clone();
    let request = context.request.clone();
    let mut executed: Vec<Arc<dyn Plugin>> = Vec::new();
    let mut tracked_metadata = context.metadata.clone();
    let mut tracked_storage = context.storage.clone();

    for plugin in validators.iter().chain(transformers.iter()) {
        match plugin.process(context).await {
            Ok(next) => {
                executed.push(plugin.clone());
                tracked_metadata = next.metadata.clone();
                tracked_storage = next.storage.clone();
                context = next;
            }
            Err(error) => {
                warn!(plugin = plugin.name(), error = %error, "plugin rejected file part");
                run_cleanup(&executed, &file_info, &tracked_metadata, &tracked_storage, request, &error).await;
                return Err(error);
            }
        }
    }

    if storages.is_empty() {
        let error = PipelineError::InvalidConfiguration("no storage plugin configured".to_string());
        run_cleanup(&executed, &file_info, &tracked_metadata, &tracked_storage, request, &error).await;
        return Err(error);
    }

    if storages.len() == 1 {
        let storage = &storages[0];
        return match storage.process(context).await {
            Ok(next) => {
                info!(plugin = storage.name(), "storage sink completed");
                Ok(next.storage)
            }
            Err(error) => {
                run_cleanup(&executed, &file_info, &tracked_metadata, &tracked_storage, request, &error).await;
                Err(error)
            }
        };
    }

    run_fan_out(context.stream, storages, &file_info, &request, &mut executed, &tracked_metadata).await
}

async fn run_fan_out(
    stream: adaptive_pipeline_domain::entities::PartByteStream,
    storages: &[Arc<dyn Plugin>],
    file_info: &FileInfo,
    request: &Option<RequestHandle>,
    executed: &mut Vec<Arc<dyn Plugin>>,
    tracked_metadata: &Metadata,
) -> Result<Vec<StorageDescriptor>, PipelineError> {
    let branches = tee(stream, storages.len());
    let mut handles = Vec::with_capacity(storages.len());
    for (storage, branch) in storages.iter().cloned().zip(branches.into_iter()) {
        let branch_context = ProcessingContext::new(branch, file_info.clone(), request.clone());
        handles.push(tokio::spawn(async move { (storage.clone(), storage.process(branch_context).await) }));
    }

    let mut results = Vec::new();
    let mut first_error: Option<PipelineError> = None;
    for handle in handles {
        match handle.await {
            Ok((storage, Ok(ctx))) => {
                executed.push(storage);
                results.extend(ctx.storage);
            }
            Ok((_storage, Err(error))) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
            Err(join_error) => {
                if first_error.is_none() {
                    first_error = Some(PipelineError::Internal(join_error.to_string()));
                }
            }
        }
    }

    if let Some(error) = first_error {
        error!(error = %error, "multi-sink storage fan-out failed");
        // `results` holds the descriptors of sinks that completed before the
        // failure; it, not the pre-fan-out storage list, is what cleanup must
        // see so a surviving sink's write is actually rolled back.
        run_cleanup(executed, file_info, tracked_metadata, &results, request.clone(), &error).await;
        return Err(error);
    }

    Ok(results)
}

async fn run_cleanup(
    executed: &[Arc<dyn Plugin>],
    file_info: &FileInfo,
    metadata: &Metadata,
    storage: &[StorageDescriptor],
    request: Option<RequestHandle>,
    error: &PipelineError,
) {
    let empty_stream = Box::pin(stream::empty());
    let mut cleanup_context = ProcessingContext::new(empty_stream, file_info.clone(), request);
    cleanup_context.metadata = metadata.clone();
    cleanup_context.storage = storage.to_vec();

    for plugin in executed.iter().rev() {
        plugin.cleanup(&cleanup_context, error).await;
    }
}
