// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingest Request Use Case
//!
//! Wraps the [`MultipartService`] façade with the one piece of wire-framing
//! logic a caller must supply before ingestion can start: deriving a
//! [`Boundary`] from the request's `Content-Type` header.

use adaptive_pipeline_domain::entities::{AggregateResult, RequestHandle};
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::value_objects::{Boundary, Limits};
use bytes::Bytes;
use futures::stream::Stream;

use crate::application::services::MultipartService;

/// Ingests one HTTP request body given its raw `Content-Type` header value
/// and byte stream, returning the aggregated field/file result.
pub async fn ingest_request<S>(
    service: &MultipartService,
    content_type: &str,
    body: S,
    limits: Limits,
    request: Option<RequestHandle>,
) -> Result<AggregateResult, PipelineError>
where
    S: Stream<Item = Result<Bytes, PipelineError>> + Send + Unpin + 'static,
{
    let boundary = Boundary::parse_content_type(content_type)?;
    service.ingest(body, boundary, limits, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::PluginChain;
    use futures::stream;

    #[tokio::test]
    async fn rejects_non_multipart_content_type() {
        let service = MultipartService::new(PluginChain::default());
        let body = stream::iter(vec![Ok(Bytes::from_static(b""))]);
        let err = ingest_request(&service, "application/json", body, Limits::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Framing(_)));
    }

    #[tokio::test]
    async fn parses_boundary_and_delegates_to_service() {
        let service = MultipartService::new(PluginChain::default());
        let body: &[u8] = b"--B\r\nContent-Disposition: form-data; name=\"u\"\r\n\r\njohn\r\n--B--\r\n";
        let stream = stream::iter(vec![Ok(Bytes::from_static(body))]);
        let result = ingest_request(
            &service,
            "multipart/form-data; boundary=B",
            stream,
            Limits::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(result.fields.len(), 1);
    }
}
