// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Adaptive Pipeline Domain
//!
//! Pure, reusable business logic for the multipart ingestion pipeline:
//! value objects, entities, domain services, and the plugin port, with no
//! dependency on an async runtime, an HTTP framework, or any concrete
//! storage/transport.
//!
//! ## Architecture
//!
//! Following Domain-Driven Design and Clean Architecture principles:
//!
//! - **Value Objects** (`value_objects`): the boundary token and its derived
//!   search patterns, and the request-wide quantitative limits.
//! - **Entities** (`entities`): part headers, file info, the processing
//!   context threaded through a pipeline, parser events, and the
//!   aggregate result.
//! - **Domain Services** (`services`): the boundary scanner, the header
//!   parser, and the `Plugin` trait that validators, transformers, and
//!   storage drivers all implement.
//!
//! The async, I/O-bound realization of the multipart parser's state machine
//! and the pipeline manager's execution/cleanup ledger live in the
//! `adaptive-pipeline` infrastructure crate, which depends on this one.

pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

pub use error::{ErrorCode, LimitKind, PipelineError};
pub use value_objects::{Boundary, Limits};
