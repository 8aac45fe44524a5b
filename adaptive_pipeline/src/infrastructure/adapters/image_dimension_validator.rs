// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image Dimension Validator
//!
//! For PNG and JPEG parts, reads just enough of the header to learn width
//! and height without decoding pixel data, rejecting a part outside the
//! configured bounds or above the 100,000px absolute guard regardless of
//! configuration (a malformed or adversarial header claiming an enormous
//! canvas must not reach a downstream decoder).

use adaptive_pipeline_domain::entities::ProcessingContext;
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Plugin, PluginKind};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;

/// Absolute ceiling on either dimension, independent of configuration.
const ABSOLUTE_MAX_DIMENSION: u32 = 100_000;

/// Largest prefix this validator ever needs to buffer to find PNG's IHDR
/// chunk or a JPEG SOF marker.
const SNIFF_WINDOW: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dimensions {
    width: u32,
    height: u32,
}

fn read_png_dimensions(buf: &[u8]) -> Option<Dimensions> {
    const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
    if !buf.starts_with(SIGNATURE) || buf.len() < SIGNATURE.len() + 8 + 8 {
        return None;
    }
    let ihdr = &buf[SIGNATURE.len() + 8..];
    if ihdr.len() < 8 {
        return None;
    }
    let width = u32::from_be_bytes(ihdr[0..4].try_into().ok()?);
    let height = u32::from_be_bytes(ihdr[4..8].try_into().ok()?);
    Some(Dimensions { width, height })
}

/// Walks JPEG markers looking for a start-of-frame (SOF0/SOF2) segment,
/// which carries the pixel dimensions. Returns `None` if the frame marker
/// wasn't found within the buffered prefix.
fn read_jpeg_dimensions(buf: &[u8]) -> Option<Dimensions> {
    if buf.len() < 4 || buf[0] != 0xFF || buf[1] != 0xD8 {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= buf.len() {
        if buf[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = buf[pos + 1];
        if marker == 0xD8 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        if pos + 4 > buf.len() {
            break;
        }
        let segment_len = u16::from_be_bytes([buf[pos + 2], buf[pos + 3]]) as usize;
        let is_sof = matches!(marker, 0xC0 | 0xC1 | 0xC2 | 0xC3);
        if is_sof {
            if pos + 9 > buf.len() {
                return None;
            }
            let height = u16::from_be_bytes([buf[pos + 5], buf[pos + 6]]) as u32;
            let width = u16::from_be_bytes([buf[pos + 7], buf[pos + 8]]) as u32;
            return Some(Dimensions { width, height });
        }
        pos += 2 + segment_len;
    }
    None
}

/// Rejects image parts whose sniffed dimensions fall outside
/// `[min_dimension, max_dimension]` (each clamped to [`ABSOLUTE_MAX_DIMENSION`]).
pub struct ImageDimensionValidator {
    min_dimension: u32,
    max_dimension: u32,
}

impl ImageDimensionValidator {
    pub fn new(min_dimension: u32, max_dimension: u32) -> Self {
        Self {
            min_dimension,
            max_dimension: max_dimension.min(ABSOLUTE_MAX_DIMENSION),
        }
    }
}

#[async_trait]
impl Plugin for ImageDimensionValidator {
    fn kind(&self) -> PluginKind {
        PluginKind::Validator
    }

    fn name(&self) -> &str {
        "image-dimension-validator"
    }

    async fn process(&self, mut context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        if !context.file_info.mime_type().starts_with("image/") {
            return Ok(context);
        }

        let mut stream = context.stream;
        let mut prefix = BytesMut::with_capacity(SNIFF_WINDOW);
        let mut exhausted = false;
        while prefix.len() < SNIFF_WINDOW {
            match stream.next().await {
                Some(Ok(chunk)) => prefix.extend_from_slice(&chunk),
                Some(Err(err)) => return Err(err),
                None => {
                    exhausted = true;
                    break;
                }
            }
        }

        if let Some(dims) = read_png_dimensions(&prefix).or_else(|| read_jpeg_dimensions(&prefix)) {
            if dims.width > ABSOLUTE_MAX_DIMENSION || dims.height > ABSOLUTE_MAX_DIMENSION {
                return Err(PipelineError::plugin(format!(
                    "image dimensions {}x{} exceed the absolute guard of {ABSOLUTE_MAX_DIMENSION}px",
                    dims.width, dims.height
                )));
            }
            if dims.width < self.min_dimension
                || dims.height < self.min_dimension
                || dims.width > self.max_dimension
                || dims.height > self.max_dimension
            {
                return Err(PipelineError::plugin(format!(
                    "image dimensions {}x{} outside configured bounds [{}, {}]",
                    dims.width, dims.height, self.min_dimension, self.max_dimension
                )));
            }
        }

        let prefix = prefix.freeze();
        let wrapped = async_stream::stream! {
            if !prefix.is_empty() {
                yield Ok::<Bytes, PipelineError>(prefix);
            }
            if !exhausted {
                let mut stream = stream;
                while let Some(item) = stream.next().await {
                    yield item;
                }
            }
        };
        context.replace_stream(Box::pin(wrapped))?;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_pipeline_domain::entities::{FileInfo, PartByteStream, PartHeaders};
    use futures::stream;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"\x89PNG\r\n\x1a\n");
        buf.extend_from_slice(&[0u8; 4]); // IHDR chunk length (unused by reader)
        buf.extend_from_slice(b"IHDR");
        buf.extend_from_slice(&width.to_be_bytes());
        buf.extend_from_slice(&height.to_be_bytes());
        buf
    }

    fn image_context(body: Vec<u8>) -> ProcessingContext {
        let stream: PartByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from(body))]));
        let mut headers = PartHeaders::new();
        headers.insert("content-type".to_string(), "image/png".to_string());
        let info = FileInfo::new("f", "a.png", headers);
        ProcessingContext::new(stream, info, None)
    }

    #[test]
    fn reads_png_dimensions_from_ihdr() {
        let buf = png_header(800, 600);
        assert_eq!(read_png_dimensions(&buf), Some(Dimensions { width: 800, height: 600 }));
    }

    #[tokio::test]
    async fn accepts_dimensions_within_bounds() {
        let validator = ImageDimensionValidator::new(1, 2000);
        let ctx = validator.process(image_context(png_header(800, 600))).await;
        assert!(ctx.is_ok());
    }

    #[tokio::test]
    async fn rejects_dimensions_outside_configured_bounds() {
        let validator = ImageDimensionValidator::new(1, 500);
        let err = validator.process(image_context(png_header(800, 600))).await.unwrap_err();
        assert!(matches!(err, PipelineError::Plugin(_)));
    }

    #[tokio::test]
    async fn rejects_above_absolute_guard_even_if_configured_higher() {
        let validator = ImageDimensionValidator::new(1, 1_000_000);
        let err = validator
            .process(image_context(png_header(200_000, 600)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Plugin(_)));
    }

    #[tokio::test]
    async fn non_image_mime_is_passed_through_untouched() {
        let stream: PartByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from_static(b"hello"))]));
        let info = FileInfo::new("f", "a.txt", PartHeaders::new());
        let context = ProcessingContext::new(stream, info, None);
        let validator = ImageDimensionValidator::new(1, 10);
        assert!(validator.process(context).await.is_ok());
    }
}
