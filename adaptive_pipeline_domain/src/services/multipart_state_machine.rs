// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Multipart State Machine
//!
//! The pure, synchronous heart of the multipart parser: the
//! preamble → headers → body → boundary state machine from component
//! design §4.2, with quantitative limit enforcement. It knows nothing about
//! async runtimes or back-pressured channels — it is driven by whoever owns
//! the inbound byte stream, one chunk at a time, and emits [`StateEvent`]s
//! describing what happened.
//!
//! The infrastructure layer's multipart parser wraps this with an
//! `AsyncRead`/`Stream` adapter that turns `FileBodyStart`/`FileBody`/
//! `FileBodyEnd` events into an actual back-pressured [`PartByteStream`].
//! Keeping the state machine itself synchronous and I/O-free is what makes
//! it trivial to drive with arbitrary chunkings in tests (§8 invariant 2).

use crate::entities::file_info::FileInfo;
use crate::error::{LimitKind, PipelineError};
use crate::services::boundary_scanner::{BoundaryScanner, ScanOutcome};
use crate::services::header_parser::{parse_content_disposition, parse_header_block};
use crate::value_objects::boundary::Boundary;
use crate::value_objects::limits::Limits;
use bytes::Bytes;

/// Safety cap on how many header bytes one part may carry before the
/// blank-line terminator is seen. Not part of the external limit table;
/// guards against unbounded buffering on a malformed/malicious part that
/// never terminates its header block.
const MAX_HEADER_BLOCK_BYTES: usize = 64 * 1024;

/// An event emitted by the state machine as it advances through one inbound
/// chunk. Stream-framework-agnostic: `FileBody` carries owned bytes rather
/// than a stream, so the infra adapter can forward them into a channel.
#[derive(Debug)]
pub enum StateEvent {
    Field(String, String),
    FileBodyStart(FileInfo),
    FileBody(Bytes),
    FileBodyEnd,
    Limit(LimitKind, u64),
    Finish,
    Error(PipelineError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Preamble,
    /// Just matched a leading or inline delimiter; waiting to resolve
    /// whether the next two bytes are `--` (final) or CRLF (continue).
    PostDelimiter,
    Headers,
    BodyField,
    BodyFile,
    Epilogue,
    Done,
    Failed,
}

enum PostDelimiterOutcome {
    Final { rest_consumed: usize },
    Continue { rest_consumed: usize },
    Malformed,
}

/// Resolves the two bytes immediately following a delimiter match. Returns
/// `None` when fewer than two bytes are available yet — the caller must
/// retain `tail` as carryover and wait for more data, never guessing from a
/// partial lookahead.
fn resolve_post_delimiter(tail: &[u8]) -> Option<PostDelimiterOutcome> {
    if tail.len() < 2 {
        return None;
    }
    Some(if &tail[0..2] == b"--" {
        PostDelimiterOutcome::Final { rest_consumed: 2 }
    } else if &tail[0..2] == b"\r\n" {
        PostDelimiterOutcome::Continue { rest_consumed: 2 }
    } else {
        PostDelimiterOutcome::Malformed
    })
}

/// The chunk-driven state machine described in component design §4.2.
pub struct MultipartStateMachine {
    state: State,
    limits: Limits,
    leading_scanner: BoundaryScanner,
    inline_scanner: BoundaryScanner,
    header_terminator: BoundaryScanner,
    carryover: Vec<u8>,
    header_buf: Vec<u8>,
    field_buf: Vec<u8>,
    current_field_name: Option<String>,
    files_seen: u64,
    fields_seen: u64,
    current_file_bytes: u64,
    failed: bool,
}

impl MultipartStateMachine {
    pub fn new(boundary: Boundary, limits: Limits) -> Self {
        Self {
            leading_scanner: BoundaryScanner::new(boundary.leading_delimiter()),
            inline_scanner: BoundaryScanner::new(boundary.inline_delimiter()),
            header_terminator: BoundaryScanner::new(b"\r\n\r\n"),
            state: State::Preamble,
            limits,
            carryover: Vec::new(),
            header_buf: Vec::new(),
            field_buf: Vec::new(),
            current_field_name: None,
            files_seen: 0,
            fields_seen: 0,
            current_file_bytes: 0,
            failed: false,
        }
    }

    /// Feeds one inbound chunk to the state machine, returning every event
    /// produced while consuming it. May return multiple events (a chunk can
    /// complete several parts) or zero (a chunk that's entirely absorbed
    /// into carryover).
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<StateEvent> {
        let mut events = Vec::new();
        if self.failed || matches!(self.state, State::Done) {
            return events;
        }

        let mut buf = std::mem::take(&mut self.carryover);
        buf.extend_from_slice(chunk);
        let mut cursor = 0usize;

        loop {
            if self.failed {
                break;
            }
            let remaining = &buf[cursor..];
            match self.state.clone() {
                State::Preamble => {
                    match self.leading_scanner.scan(remaining) {
                        ScanOutcome::Match { match_end, .. } => {
                            self.state = State::PostDelimiter;
                            cursor += match_end;
                        }
                        ScanOutcome::NoMatch { body_end } => {
                            cursor += body_end;
                            break;
                        }
                    }
                }
                State::PostDelimiter => {
                    match resolve_post_delimiter(remaining) {
                        None => break,
                        Some(PostDelimiterOutcome::Final { rest_consumed }) => {
                            cursor += rest_consumed;
                            self.state = State::Epilogue;
                        }
                        Some(PostDelimiterOutcome::Continue { rest_consumed }) => {
                            cursor += rest_consumed;
                            self.state = State::Headers;
                        }
                        Some(PostDelimiterOutcome::Malformed) => {
                            self.fail(&mut events, PipelineError::framing("expected CRLF or final delimiter after boundary"));
                            break;
                        }
                    }
                }
                State::Headers => {
                    self.header_buf.extend_from_slice(remaining);
                    if self.header_buf.len() > MAX_HEADER_BLOCK_BYTES {
                        self.fail(&mut events, PipelineError::framing("header block exceeds safety cap"));
                        break;
                    }
                    match self.header_terminator.scan(&self.header_buf) {
                        ScanOutcome::Match { body_end, match_end } => {
                            let already_had = self.header_buf.len() - remaining.len();
                            let consumed_from_remaining = match_end.saturating_sub(already_had);
                            let block = self.header_buf[..body_end + 2].to_vec();
                            self.header_buf.clear();
                            cursor += consumed_from_remaining.min(remaining.len());
                            if let Some(ev) = self.begin_part(&block, &mut events) {
                                events.push(ev);
                            }
                        }
                        ScanOutcome::NoMatch { .. } => {
                            // Need more data; all of `remaining` has already
                            // been folded into header_buf above.
                            cursor = buf.len();
                            break;
                        }
                    }
                }
                State::BodyField => {
                    match self.inline_scanner.scan(remaining) {
                        ScanOutcome::Match { body_end, match_end } => {
                            self.field_buf.extend_from_slice(&remaining[..body_end]);
                            if self.field_buf.len() as u64 > self.limits.field_size {
                                events.push(StateEvent::Limit(LimitKind::FieldSize, self.limits.field_size));
                                self.fail(&mut events, PipelineError::LimitExceeded {
                                    kind: LimitKind::FieldSize,
                                    configured: self.limits.field_size,
                                });
                                break;
                            }
                            let value = String::from_utf8_lossy(&self.field_buf).into_owned();
                            let name = self.current_field_name.take().unwrap_or_default();
                            events.push(StateEvent::Field(name, value));
                            self.field_buf.clear();
                            self.state = State::PostDelimiter;
                            cursor += match_end;
                        }
                        ScanOutcome::NoMatch { body_end } => {
                            self.field_buf.extend_from_slice(&remaining[..body_end]);
                            if self.field_buf.len() as u64 > self.limits.field_size {
                                events.push(StateEvent::Limit(LimitKind::FieldSize, self.limits.field_size));
                                self.fail(&mut events, PipelineError::LimitExceeded {
                                    kind: LimitKind::FieldSize,
                                    configured: self.limits.field_size,
                                });
                                break;
                            }
                            cursor += body_end;
                            break;
                        }
                    }
                }
                State::BodyFile => {
                    match self.inline_scanner.scan(remaining) {
                        ScanOutcome::Match { body_end, match_end } => {
                            if body_end > 0 {
                                self.emit_file_body(&remaining[..body_end], &mut events);
                                if self.failed {
                                    break;
                                }
                            }
                            events.push(StateEvent::FileBodyEnd);
                            self.state = State::PostDelimiter;
                            cursor += match_end;
                        }
                        ScanOutcome::NoMatch { body_end } => {
                            if body_end > 0 {
                                self.emit_file_body(&remaining[..body_end], &mut events);
                                if self.failed {
                                    break;
                                }
                            }
                            cursor += body_end;
                            break;
                        }
                    }
                }
                State::Epilogue => {
                    cursor = buf.len();
                    break;
                }
                State::Done | State::Failed => break,
            }
        }

        if !self.failed && !matches!(self.state, State::Done) {
            self.carryover = buf[cursor..].to_vec();
        }
        events
    }

    /// Signals end-of-input. If the final delimiter was seen, emits
    /// `Finish`; otherwise the request ends in a framing error per
    /// invariant 4 (a truncated body is always an error, never a silent
    /// success).
    pub fn finish_input(&mut self) -> Vec<StateEvent> {
        let mut events = Vec::new();
        if self.failed {
            return events;
        }
        match self.state {
            State::Epilogue | State::Done => {
                self.state = State::Done;
                events.push(StateEvent::Finish);
            }
            State::BodyFile => {
                self.fail(
                    &mut events,
                    PipelineError::framing("stream ended before final delimiter while reading a file part"),
                );
            }
            _ => {
                self.fail(&mut events, PipelineError::framing("stream ended before final delimiter"));
            }
        }
        events
    }

    fn emit_file_body(&mut self, data: &[u8], events: &mut Vec<StateEvent>) {
        self.current_file_bytes += data.len() as u64;
        if self.current_file_bytes > self.limits.file_size {
            events.push(StateEvent::Limit(LimitKind::FileSize, self.limits.file_size));
            events.push(StateEvent::FileBodyEnd);
            self.fail(
                events,
                PipelineError::LimitExceeded {
                    kind: LimitKind::FileSize,
                    configured: self.limits.file_size,
                },
            );
            return;
        }
        events.push(StateEvent::FileBody(Bytes::copy_from_slice(data)));
    }

    /// Parses the header block that just terminated and transitions into
    /// `BodyField`/`BodyFile`, enforcing the `files`/`fields` count limits.
    /// Returns the `Field`/`FileBodyStart` event is pushed directly onto
    /// `events` by the caller via the returned value (field emission is
    /// immediate since field bodies for *empty* values still need a
    /// boundary to terminate, so only `FileBodyStart` is returned eagerly
    /// here).
    fn begin_part(&mut self, header_block: &[u8], events: &mut Vec<StateEvent>) -> Option<StateEvent> {
        let headers = match parse_header_block(header_block) {
            Ok(h) => h,
            Err(e) => {
                self.fail(events, e);
                return None;
            }
        };
        let raw_disposition = match headers.get("content-disposition") {
            Some(v) => v.to_string(),
            None => {
                self.fail(events, PipelineError::framing("part is missing Content-Disposition"));
                return None;
            }
        };
        let disposition = match parse_content_disposition(&raw_disposition) {
            Ok(d) => d,
            Err(e) => {
                self.fail(events, e);
                return None;
            }
        };

        if disposition.field_name.len() as u64 > self.limits.field_name_size {
            events.push(StateEvent::Limit(LimitKind::FieldNameSize, self.limits.field_name_size));
            self.fail(
                events,
                PipelineError::LimitExceeded {
                    kind: LimitKind::FieldNameSize,
                    configured: self.limits.field_name_size,
                },
            );
            return None;
        }

        match disposition.filename {
            Some(filename) => {
                self.files_seen += 1;
                if self.files_seen > self.limits.files {
                    events.push(StateEvent::Limit(LimitKind::Files, self.limits.files));
                    self.fail(
                        events,
                        PipelineError::LimitExceeded {
                            kind: LimitKind::Files,
                            configured: self.limits.files,
                        },
                    );
                    return None;
                }
                self.current_file_bytes = 0;
                let info = FileInfo::new(disposition.field_name, filename, headers);
                self.state = State::BodyFile;
                Some(StateEvent::FileBodyStart(info))
            }
            None => {
                self.fields_seen += 1;
                if self.fields_seen > self.limits.fields {
                    events.push(StateEvent::Limit(LimitKind::Fields, self.limits.fields));
                    self.fail(
                        events,
                        PipelineError::LimitExceeded {
                            kind: LimitKind::Fields,
                            configured: self.limits.fields,
                        },
                    );
                    return None;
                }
                self.current_field_name = Some(disposition.field_name);
                self.field_buf.clear();
                self.state = State::BodyField;
                None
            }
        }
    }

    fn fail(&mut self, events: &mut Vec<StateEvent>, error: PipelineError) {
        self.failed = true;
        self.state = State::Failed;
        events.push(StateEvent::Error(error));
    }
}
