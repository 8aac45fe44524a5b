// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stream Tee
//!
//! Fans a single upstream part-byte-stream out to `fan_out` independent
//! consumers, for the pipeline manager's multi-destination storage case
//! (component design §4.3). One task reads the upstream source and forwards
//! every chunk to every branch's bounded channel in turn; because each send
//! is awaited, the slowest branch governs how fast the upstream is read, per
//! the design's back-pressure requirement.

use adaptive_pipeline_domain::entities::PartByteStream;
use adaptive_pipeline_domain::error::PipelineError;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::sync::mpsc;

const TEE_CHANNEL_CAPACITY: usize = 8;

/// Splits `upstream` into `fan_out` independent streams. `fan_out == 1`
/// returns `upstream` unchanged with no extra task or channel.
pub fn tee(upstream: PartByteStream, fan_out: usize) -> Vec<PartByteStream> {
    if fan_out <= 1 {
        return vec![upstream];
    }

    let mut senders = Vec::with_capacity(fan_out);
    let mut branches = Vec::with_capacity(fan_out);
    for _ in 0..fan_out {
        let (tx, rx) = mpsc::channel::<Result<Bytes, PipelineError>>(TEE_CHANNEL_CAPACITY);
        senders.push(tx);
        let branch: PartByteStream = Box::pin(async_stream::stream! {
            let mut rx = rx;
            while let Some(item) = rx.recv().await {
                yield item;
            }
        });
        branches.push(branch);
    }

    tokio::spawn(async move {
        let mut upstream = upstream;
        while let Some(item) = upstream.next().await {
            let is_err = item.is_err();
            for tx in &senders {
                let forwarded = match &item {
                    Ok(bytes) => Ok(bytes.clone()),
                    Err(e) => Err(e.clone()),
                };
                let _ = tx.send(forwarded).await;
            }
            if is_err {
                break;
            }
        }
    });

    branches
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn fan_out_one_is_a_no_op() {
        let upstream: PartByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from_static(b"x"))]));
        let branches = tee(upstream, 1);
        assert_eq!(branches.len(), 1);
    }

    #[tokio::test]
    async fn every_branch_sees_every_chunk() {
        let chunks = vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"b"))];
        let upstream: PartByteStream = Box::pin(stream::iter(chunks));
        let branches = tee(upstream, 3);

        for mut branch in branches {
            let mut collected = Vec::new();
            while let Some(item) = branch.next().await {
                collected.extend_from_slice(&item.unwrap());
            }
            assert_eq!(collected, b"ab");
        }
    }
}
