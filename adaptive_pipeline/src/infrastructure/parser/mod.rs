// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure realization of the domain's multipart state machine: the
//! async adapter that pumps a byte stream through it and materializes
//! back-pressured file-part streams.

pub mod multipart_parser;

pub use multipart_parser::parse_multipart;
