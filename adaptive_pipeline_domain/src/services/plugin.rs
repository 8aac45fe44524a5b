// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Plugin Contract
//!
//! The uniform `process`/`cleanup`/`initialize`/`shutdown` protocol that lets
//! the pipeline manager compose any concrete validator, transformer, or
//! storage driver without knowing its implementation. See component design
//! §4.4.
//!
//! ## Dynamic dispatch, not class hierarchies
//!
//! A plugin is a trait object (`Arc<dyn Plugin>`) tagged with a [`PluginKind`]
//! so the manager knows which composition role it plays. This is the "tagged
//! union over a fixed capability set" the design notes call for, not an
//! inheritance hierarchy.

use crate::entities::processing_context::ProcessingContext;
use crate::error::PipelineError;
use async_trait::async_trait;

/// Which of the three composition roles a plugin plays. The pipeline
/// manager uses this only for diagnostics and ordering validation; dispatch
/// itself is through the one `process` method every plugin implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Validator,
    Transformer,
    Storage,
}

/// The capability set every pipeline plugin implements.
///
/// ## Lifecycle
///
/// - `initialize` runs once, process-wide, before the plugin accepts
///   traffic.
/// - `process` runs once per file part; implementations must be safe to call
///   concurrently across different requests.
/// - `cleanup` runs at most once per file part, only for plugins whose
///   `process` already returned successfully, only when the pipeline later
///   fails.
/// - `shutdown` runs once, process-wide, at termination.
///
/// All four default to no-ops; only `process` is semantically mandatory to
/// override.
///
/// ## Per-request state
///
/// A plugin instance is shared across requests (process-wide). Any
/// per-request counters (the size limiter's running total, the rate
/// limiter's bucket) must be held keyed by request, not as plugin-wide
/// mutable fields, and reset via `reset_request` rather than implicitly —
/// see the shared mutable state design note.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Which composition role this plugin plays.
    fn kind(&self) -> PluginKind;

    /// A short, stable name used in logs and the executed-plugins ledger.
    fn name(&self) -> &str;

    /// Runs once, process-wide, before the plugin is used to process any
    /// request. Default: no-op.
    async fn initialize(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Validates that this plugin is configured correctly (required
    /// parameters present, ranges sane) independent of any particular
    /// request. Default: always valid.
    fn validate_config(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Processes one file part.
    ///
    /// - A **validator** returns the context unchanged (optionally with its
    ///   stream wrapped by a pass-through that can fail asynchronously on an
    ///   observed violation), or returns `Err` to reject synchronously.
    /// - A **transformer** returns a context whose `stream` has been
    ///   replaced by a new lazily-transformed sequence.
    /// - **Storage** consumes the stream fully and returns a context with a
    ///   new entry appended to `storage`.
    async fn process(&self, context: ProcessingContext) -> Result<ProcessingContext, PipelineError>;

    /// Called exactly once, in reverse process order, for every plugin that
    /// returned successfully from `process` when the pipeline as a whole
    /// later fails. `error` is the error that caused the pipeline to fail.
    /// Cleanup errors are logged by the pipeline manager but never replace
    /// `error`. Default: no-op.
    async fn cleanup(&self, _context: &ProcessingContext, _error: &PipelineError) {}

    /// Runs once, process-wide, at termination. Default: no-op.
    async fn shutdown(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Resets any per-request state this plugin instance holds. The
    /// framework calls this between requests for plugins that declare
    /// per-request state; plugins with none can rely on the default no-op.
    fn reset_request(&self, _request_id: uuid::Uuid) {}
}

/// Extension point for a storage plugin's rollback primitive: remove a
/// previously-written object by the key recorded in its
/// [`StorageDescriptor`](crate::entities::processing_context::StorageDescriptor).
#[async_trait]
pub trait Deletable: Send + Sync {
    async fn delete(&self, key: &str) -> Result<(), PipelineError>;
}
