// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rate Limit Validator
//!
//! A token-bucket check keyed by [`RequestHandle::remote_key`], held in a
//! bounded, LRU-evicted store so a flood of distinct keys can't grow the
//! bucket table without bound. Per-request state lives here rather than as
//! an unbounded per-plugin map, consistent with the shared mutable state
//! design note: the store is itself the bounded, explicitly-managed state.

use adaptive_pipeline_domain::entities::ProcessingContext;
use adaptive_pipeline_domain::error::PipelineError;
use adaptive_pipeline_domain::services::{Plugin, PluginKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A bounded map from key to token bucket, evicting the least-recently-used
/// entry once `capacity` keys are held.
struct LruBucketStore {
    capacity: usize,
    buckets: HashMap<String, Bucket>,
    recency: VecDeque<String>,
}

impl LruBucketStore {
    fn new(capacity: usize) -> Self {
        Self { capacity, buckets: HashMap::new(), recency: VecDeque::new() }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push_back(key.to_string());
    }

    fn entry_mut(&mut self, key: &str, refill_rate: f64, burst: f64) -> &mut Bucket {
        if !self.buckets.contains_key(key) {
            if self.buckets.len() >= self.capacity {
                if let Some(oldest) = self.recency.pop_front() {
                    self.buckets.remove(&oldest);
                }
            }
            self.buckets.insert(key.to_string(), Bucket { tokens: burst, last_refill: Instant::now() });
            let _ = refill_rate;
        }
        self.touch(key);
        self.buckets.get_mut(key).expect("just inserted or already present")
    }
}

/// Rejects a file part once the request's key has exhausted its token
/// bucket. `refill_per_second` tokens regenerate continuously up to
/// `burst`; one token is spent per processed file part.
pub struct RateLimitValidator {
    refill_per_second: f64,
    burst: f64,
    store: Mutex<LruBucketStore>,
}

impl RateLimitValidator {
    pub fn new(refill_per_second: f64, burst: f64, max_tracked_keys: usize) -> Self {
        Self {
            refill_per_second,
            burst,
            store: Mutex::new(LruBucketStore::new(max_tracked_keys)),
        }
    }
}

#[async_trait]
impl Plugin for RateLimitValidator {
    fn kind(&self) -> PluginKind {
        PluginKind::Validator
    }

    fn name(&self) -> &str {
        "rate-limit-validator"
    }

    async fn process(&self, context: ProcessingContext) -> Result<ProcessingContext, PipelineError> {
        let key = context
            .request
            .as_ref()
            .and_then(|r| r.remote_key.clone())
            .unwrap_or_else(|| "anonymous".to_string());

        let allowed = {
            let mut store = self.store.lock();
            let bucket = store.entry_mut(&key, self.refill_per_second, self.burst);
            let now = Instant::now();
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.burst);
            bucket.last_refill = now;
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                true
            } else {
                false
            }
        };

        if !allowed {
            return Err(PipelineError::plugin(format!("rate limit exceeded for key {key}")));
        }
        Ok(context)
    }
}
