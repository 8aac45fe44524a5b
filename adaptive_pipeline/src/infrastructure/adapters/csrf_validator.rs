// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CSRF Validator
//!
//! Compares a request-scoped token (found under `csrf_token` in
//! [`RequestHandle::claims`](adaptive_pipeline_domain::entities::RequestHandle))
//! against the expected value for that request, in constant time so the
//! comparison's timing doesn't leak how many leading bytes matched.

use adaptive_pipeline_domain::entities::ProcessingContext;
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Plugin, PluginKind};
use async_trait::async_trait;

const CLAIM_KEY: &str = "csrf_token";

/// Constant-time byte comparison: always walks the full length of the
/// longer input so elapsed time doesn't depend on where the first
/// mismatching byte falls.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Rejects a file part unless the request's `csrf_token` claim matches
/// `expected`.
pub struct CsrfValidator {
    expected: String,
}

impl CsrfValidator {
    pub fn new(expected: impl Into<String>) -> Self {
        Self { expected: expected.into() }
    }
}

#[async_trait]
impl Plugin for CsrfValidator {
    fn kind(&self) -> PluginKind {
        PluginKind::Validator
    }

    fn name(&self) -> &str {
        "csrf-validator"
    }

    async fn process(&self, context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        let token = context
            .request
            .as_ref()
            .and_then(|r| r.claims.get(CLAIM_KEY))
            .map(String::as_str)
            .unwrap_or("");

        if !constant_time_eq(token.as_bytes(), self.expected.as_bytes()) {
            return Err(PipelineError::plugin("csrf token mismatch"));
        }
        Ok(context)
    }
}
