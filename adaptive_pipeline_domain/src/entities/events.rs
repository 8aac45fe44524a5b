// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parser Events
//!
//! The synchronous event vocabulary the multipart parser emits, per the
//! component design's "Events" list: `field`, `file`, `limit`, `finish`,
//! `error`.

use crate::entities::file_info::FileInfo;
use crate::entities::processing_context::PartByteStream;
use crate::error::{LimitKind, PipelineError};

/// One event emitted by the parser as it advances through an inbound chunk.
/// Multiple events may be emitted for a single `write_chunk` call (e.g. a
/// chunk containing several complete parts).
pub enum ParserEvent {
    /// A field part completed: `(name, value)`.
    Field(String, String),
    /// A file part began: metadata plus its not-yet-consumed body stream.
    /// The stream must be attached to a consumer in the same synchronous
    /// turn the event is observed in.
    File(FileInfo, PartByteStream),
    /// A configured limit was exceeded, emitted immediately before the
    /// corresponding `Error` event (observability ordering requirement in
    /// the error handling design).
    Limit(LimitKind, u64),
    /// The final delimiter was seen and any epilogue consumed; no further
    /// events follow except possibly ones already queued from the same
    /// chunk.
    Finish,
    /// A terminal parser error; at most one is ever emitted.
    Error(PipelineError),
}

impl std::fmt::Debug for ParserEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserEvent::Field(name, value) => f.debug_tuple("Field").field(name).field(value).finish(),
            ParserEvent::File(info, _) => f.debug_tuple("File").field(info).finish(),
            ParserEvent::Limit(kind, configured) => f.debug_tuple("Limit").field(kind).field(configured).finish(),
            ParserEvent::Finish => write!(f, "Finish"),
            ParserEvent::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}
