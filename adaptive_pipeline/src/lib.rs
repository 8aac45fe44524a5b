// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Adaptive Pipeline
//!
//! The async, I/O-bound realization of the multipart ingestion pipeline
//! described by `adaptive-pipeline-domain`'s pure state machine and plugin
//! contract.
//!
//! ## Architecture
//!
//! - **Infrastructure** (`infrastructure`): the async multipart parser
//!   adapter, the pipeline manager's execution/cleanup runtime, concrete
//!   leaf plugins (validators, transformers, storage drivers), and the
//!   ambient configuration/logging stack.
//! - **Application** (`application`): the `MultipartService` façade and the
//!   use cases built on it — the only layer a caller (an HTTP handler, the
//!   bootstrap CLI) should depend on directly.
//!
//! Everything in this crate is generalized from the teacher's own
//! infrastructure/application split; the domain crate's pure services are
//! never reimplemented here, only driven.

pub mod application;
pub mod infrastructure;

pub use application::services::{MultipartService, PluginChain};
pub use application::use_cases::ingest_request;
