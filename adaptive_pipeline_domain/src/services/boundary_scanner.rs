// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Boundary Scanner
//!
//! The zero-copy byte search primitive underlying the multipart parser. Given
//! a search buffer (prior carryover concatenated with the newest chunk) and a
//! delimiter pattern, the scanner reports where the pattern starts, how much
//! of the buffer is safe to emit as body, and how much must be retained as
//! carryover for the next call.
//!
//! ## Why a dedicated type
//!
//! Two historical bugs motivate keeping this logic isolated and heavily
//! tested in its own module, not inlined into the parser's state machine:
//!
//! 1. Carryover length arithmetic that underflows instead of clamping to
//!    zero, which in some languages silently slices from the wrong end of
//!    the buffer.
//! 2. A final-delimiter lookahead that bounds-checks against the *original
//!    chunk* rather than the search buffer the match was actually found in,
//!    causing out-of-bounds reads at end-of-buffer.
//!
//! Every index this module returns addresses the *search buffer* it was
//! given, never a caller's raw chunk. [`ScanOutcome`] is returned instead of
//! a bare `usize` so callers can't accidentally re-index the wrong slice.

use memchr::memmem::Finder;

/// Result of scanning one search buffer for a delimiter pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The pattern was found. `body_end` is the offset of the first byte of
    /// the match within the search buffer; everything before it is body.
    Match { body_end: usize, match_end: usize },
    /// The pattern was not found in this search buffer. `body_end` is the
    /// "safe frontier" — everything before it is guaranteed not to be part
    /// of a split match; the remainder must be retained as carryover.
    NoMatch { body_end: usize },
}

impl ScanOutcome {
    /// The offset of the first byte that must NOT yet be emitted as body
    /// (either the delimiter's first byte, or the start of the new
    /// carryover region).
    pub fn body_end(&self) -> usize {
        match self {
            ScanOutcome::Match { body_end, .. } => *body_end,
            ScanOutcome::NoMatch { body_end } => *body_end,
        }
    }
}

/// A pure, synchronous, allocation-light domain service that searches a
/// buffer for one fixed pattern.
///
/// One `BoundaryScanner` is built per pattern (the parser builds one for the
/// inline delimiter) and reused across every chunk of the request; it holds
/// no per-call state.
pub struct BoundaryScanner {
    finder: Finder<'static>,
    pattern_len: usize,
}

impl BoundaryScanner {
    /// Builds a scanner for the given pattern. The pattern is copied so the
    /// scanner can outlive the buffer it was derived from.
    pub fn new(pattern: &[u8]) -> Self {
        let owned: Vec<u8> = pattern.to_vec();
        Self {
            finder: Finder::new(&owned).into_owned(),
            pattern_len: pattern.len(),
        }
    }

    /// The length in bytes of the pattern this scanner searches for.
    pub fn pattern_len(&self) -> usize {
        self.pattern_len
    }

    /// Scans `search_buffer` for the pattern.
    ///
    /// - If found, returns `Match { body_end, match_end }` where
    ///   `search_buffer[..body_end]` is body and `search_buffer[body_end..match_end]`
    ///   is the matched pattern.
    /// - If not found, returns `NoMatch { body_end }` per the safe-frontier
    ///   rule: `body_end = search_buffer.len().saturating_sub(pattern_len - 1)`,
    ///   so that a pattern prefix straddling the end of this buffer is never
    ///   emitted as body. If the buffer is shorter than the pattern, `body_end`
    ///   is 0 and the entire buffer becomes carryover.
    pub fn scan(&self, search_buffer: &[u8]) -> ScanOutcome {
        if let Some(start) = self.finder.find(search_buffer) {
            return ScanOutcome::Match {
                body_end: start,
                match_end: start + self.pattern_len,
            };
        }

        // Safe-frontier rule (§4.1): retain the last `pattern_len - 1` bytes
        // as carryover since they might be the prefix of a split match.
        // `saturating_sub` guards the historical underflow hazard where a
        // buffer shorter than the pattern would otherwise produce a
        // negative-length slice.
        let retain = self.pattern_len.saturating_sub(1);
        let body_end = search_buffer.len().saturating_sub(retain);
        ScanOutcome::NoMatch { body_end }
    }

    /// Given a `search_buffer` and the `body_end` from a prior [`scan`]
    /// call's `NoMatch` outcome, returns the slice that must be carried over
    /// to be prepended to the next chunk.
    ///
    /// Carryover length is always `<= pattern_len - 1` by construction.
    pub fn carryover<'a>(&self, search_buffer: &'a [u8], body_end: usize) -> &'a [u8] {
        &search_buffer[body_end..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_match_in_middle_of_buffer() {
        let scanner = BoundaryScanner::new(b"\r\n--B");
        let buf = b"hello\r\n--Bworld";
        match scanner.scan(buf) {
            ScanOutcome::Match { body_end, match_end } => {
                assert_eq!(body_end, 5);
                assert_eq!(match_end, 5 + 5);
                assert_eq!(&buf[..body_end], b"hello");
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn no_match_retains_pattern_len_minus_one() {
        let scanner = BoundaryScanner::new(b"\r\n--B");
        let buf = b"hello world no boundary here";
        match scanner.scan(buf) {
            ScanOutcome::NoMatch { body_end } => {
                let carry = scanner.carryover(buf, body_end);
                assert!(carry.len() <= scanner.pattern_len() - 1);
                assert_eq!(body_end + carry.len(), buf.len());
            }
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[test]
    fn buffer_shorter_than_pattern_is_entirely_carryover() {
        let scanner = BoundaryScanner::new(b"\r\n--BOUNDARY");
        let buf = b"\r\n--B";
        match scanner.scan(buf) {
            ScanOutcome::NoMatch { body_end } => {
                assert_eq!(body_end, 0);
                assert_eq!(scanner.carryover(buf, body_end), &buf[..]);
            }
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[test]
    fn does_not_false_match_on_cr_prefix_only() {
        // Body starting with CR, CRLF, or CRLF- must not falsely match.
        let scanner = BoundaryScanner::new(b"\r\n--B");
        for prefix in [&b"\r"[..], b"\r\n", b"\r\n-"] {
            match scanner.scan(prefix) {
                ScanOutcome::NoMatch { body_end } => assert_eq!(body_end, 0),
                ScanOutcome::Match { .. } => panic!("must not match on partial prefix {prefix:?}"),
            }
        }
    }

    // Invariant (§8-5): len(carryover) <= len(pattern) - 1, and
    // body || carryover == search_buffer when there's no match.
    proptest::proptest! {
        #[test]
        fn carryover_never_exceeds_pattern_len_minus_one(
            buf in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..200),
            pattern in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..20),
        ) {
            let scanner = BoundaryScanner::new(&pattern);
            let outcome = scanner.scan(&buf);
            let body_end = outcome.body_end();
            proptest::prop_assert!(body_end <= buf.len());
            let carry = scanner.carryover(&buf, body_end);
            proptest::prop_assert!(carry.len() <= scanner.pattern_len().saturating_sub(1) || matches!(outcome, ScanOutcome::Match { .. }));
            proptest::prop_assert_eq!(body_end + carry.len(), buf.len());
        }
    }
}
