// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Multipart Parser Adapter
//!
//! The async, I/O-bound realization of the domain's
//! [`MultipartStateMachine`](adaptive_pipeline_domain::services::MultipartStateMachine):
//! pumps an inbound byte stream through the pure state machine and turns its
//! synchronous [`StateEvent`]s into the public, stream-carrying
//! [`ParserEvent`] vocabulary.
//!
//! Driving the state machine happens on a dedicated task so the caller can
//! consume field/file events as they arrive rather than waiting for the
//! whole request body. A file part's body is delivered over its own bounded
//! channel; since the wire format only ever has one open file part at a
//! time, that channel's `send().await` blocking on a slow consumer is
//! exactly the back-pressure the design calls for — it naturally stalls the
//! task pumping the source, which stalls whoever is feeding bytes in.

use adaptive_pipeline_domain::entities::{ParserEvent, PartByteStream};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{MultipartStateMachine, StateEvent};
use adaptive_pipeline_domain::value_objects::{Boundary, Limits};
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the outer events channel. Field/limit/finish events are
/// small and infrequent; this just keeps a few in flight.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Capacity of a single file part's body channel. Small on purpose: a
/// storage sink that falls behind should visibly push back rather than let
/// the parser buffer an unbounded amount of a multi-gigabyte upload.
const FILE_CHANNEL_CAPACITY: usize = 8;

/// Drives `source` through the multipart state machine for the given
/// boundary and limits, returning a stream of [`ParserEvent`]s.
///
/// The returned stream must be polled to completion (or dropped, which
/// cancels the driving task) — events are only produced as the state
/// machine consumes `source`.
pub fn parse_multipart<S>(source: S, boundary: Boundary, limits: Limits) -> BoxStream<'static, ParserEvent>
where
    S: Stream<Item = Result<Bytes, PipelineError>> + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel::<ParserEvent>(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(drive(source, boundary, limits, tx));

    Box::pin(async_stream::stream! {
        let mut rx = rx;
        while let Some(event) = rx.recv().await {
            yield event;
        }
    })
}

async fn drive<S>(mut source: S, boundary: Boundary, limits: Limits, tx: mpsc::Sender<ParserEvent>)
where
    S: Stream<Item = Result<Bytes, PipelineError>> + Send + Unpin + 'static,
{
    let mut state_machine = MultipartStateMachine::new(boundary, limits);
    let mut current_file_tx: Option<mpsc::Sender<Result<Bytes, PipelineError>>> = None;

    loop {
        let chunk = match source.next().await {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                warn!(error = %err, "multipart source stream failed");
                dispatch(vec![StateEvent::Error(err)], &tx, &mut current_file_tx).await;
                return;
            }
            None => break,
        };
        if !dispatch(state_machine.push_chunk(&chunk), &tx, &mut current_file_tx).await {
            return;
        }
    }
    dispatch(state_machine.finish_input(), &tx, &mut current_file_tx).await;
}

/// Forwards state-machine events onto the outer event channel, opening a
/// bounded per-file channel the moment a `FileBodyStart` arrives. Returns
/// `false` once the outer receiver has gone away, telling the driver to stop
/// pumping the source.
async fn dispatch(
    events: Vec<StateEvent>,
    tx: &mpsc::Sender<ParserEvent>,
    current_file_tx: &mut Option<mpsc::Sender<Result<Bytes, PipelineError>>>,
) -> bool {
    for event in events {
        match event {
            StateEvent::Field(name, value) => {
                if tx.send(ParserEvent::Field(name, value)).await.is_err() {
                    return false;
                }
            }
            StateEvent::FileBodyStart(info) => {
                let (file_tx, file_rx) = mpsc::channel::<Result<Bytes, PipelineError>>(FILE_CHANNEL_CAPACITY);
                let stream: PartByteStream = Box::pin(async_stream::stream! {
                    let mut file_rx = file_rx;
                    while let Some(item) = file_rx.recv().await {
                        yield item;
                    }
                });
                *current_file_tx = Some(file_tx);
                debug!(field = info.field_name(), filename = info.filename(), "file part started");
                if tx.send(ParserEvent::File(info, stream)).await.is_err() {
                    return false;
                }
            }
            StateEvent::FileBody(bytes) => {
                if let Some(file_tx) = current_file_tx.as_ref() {
                    if file_tx.send(Ok(bytes)).await.is_err() {
                        // The consumer dropped this file's stream. Keep
                        // driving the parser so later parts still frame
                        // correctly; just stop trying to deliver this one.
                        *current_file_tx = None;
                    }
                }
            }
            StateEvent::FileBodyEnd => {
                current_file_tx.take();
            }
            StateEvent::Limit(kind, configured) => {
                if tx.send(ParserEvent::Limit(kind, configured)).await.is_err() {
                    return false;
                }
            }
            StateEvent::Finish => {
                let _ = tx.send(ParserEvent::Finish).await;
            }
            StateEvent::Error(err) => {
                if let Some(file_tx) = current_file_tx.take() {
                    let _ = file_tx.send(Err(err.clone())).await;
                }
                let _ = tx.send(ParserEvent::Error(err)).await;
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn boundary() -> Boundary {
        Boundary::new(b"B".to_vec()).unwrap()
    }

    fn byte_stream(chunks: Vec<&'static [u8]>) -> BoxStream<'static, Result<Bytes, PipelineError>> {
        Box::pin(stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c)))))
    }

    #[tokio::test]
    async fn emits_field_then_finish() {
        let body: &[u8] = b"--B\r\nContent-Disposition: form-data; name=\"u\"\r\n\r\njohn\r\n--B--\r\n";
        let mut events = parse_multipart(byte_stream(vec![body]), boundary(), Limits::default());

        let first = events.next().await.unwrap();
        assert!(matches!(first, ParserEvent::Field(ref n, ref v) if n == "u" && v == "john"));
        let second = events.next().await.unwrap();
        assert!(matches!(second, ParserEvent::Finish));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn emits_file_stream_with_correct_bytes() {
        let body: &[u8] =
            b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a.bin\"\r\n\r\nhello world\r\n--B--\r\n";
        let mut events = parse_multipart(byte_stream(vec![body]), boundary(), Limits::default());

        let file_event = events.next().await.unwrap();
        let ParserEvent::File(info, mut file_stream) = file_event else {
            panic!("expected File event");
        };
        assert_eq!(info.filename(), "a.bin");

        let mut collected = Vec::new();
        while let Some(chunk) = file_stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"hello world");

        let finish = events.next().await.unwrap();
        assert!(matches!(finish, ParserEvent::Finish));
    }

    #[tokio::test]
    async fn split_across_many_tiny_chunks() {
        let body: &[u8] = b"--B\r\nContent-Disposition: form-data; name=\"u\"\r\n\r\njohn\r\n--B--\r\n";
        let chunks: Vec<&'static [u8]> = body.chunks(1).collect();
        let mut events = parse_multipart(byte_stream(chunks), boundary(), Limits::default());

        let first = events.next().await.unwrap();
        assert!(matches!(first, ParserEvent::Field(ref n, ref v) if n == "u" && v == "john"));
    }
}
