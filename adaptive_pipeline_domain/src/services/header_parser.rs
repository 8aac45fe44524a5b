// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Header Parser
//!
//! Pure, synchronous parsing of a part's CRLF-terminated header block and of
//! the `Content-Disposition` parameter list. No I/O, no parser state; this is
//! the domain logic the multipart parser's infrastructure adapter calls once
//! per part.

use crate::entities::part_headers::PartHeaders;
use crate::error::PipelineError;

/// Splits a raw header block (bytes between the part's opening CRLF and the
/// blank line that ends it, exclusive of the blank line) into a
/// [`PartHeaders`] map.
///
/// Lines are split on CRLF. A line with no colon is ignored per the lenient
/// parsing rule. Header names are case-folded to lowercase; values are
/// trimmed of surrounding whitespace only (interior whitespace preserved).
pub fn parse_header_block(block: &[u8]) -> Result<PartHeaders, PipelineError> {
    let text = String::from_utf8_lossy(block);
    let mut headers = PartHeaders::new();

    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.find(':') else {
            continue; // lines without a colon are ignored (lenient)
        };
        let name = line[..colon].trim().to_ascii_lowercase();
        let value = line[colon + 1..].trim().to_string();
        if name.is_empty() {
            continue;
        }
        headers.insert(name, value);
    }

    Ok(headers)
}

/// The two interesting fields extracted from a `Content-Disposition` header:
/// the mandatory `name` parameter and the optional `filename` parameter.
///
/// `filename` being `Some("")` (present but empty) still marks the part as a
/// file, per the filename-presence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    pub field_name: String,
    pub filename: Option<String>,
}

/// Parses a `Content-Disposition` header value of the form
/// `form-data; name="x"; filename="y.txt"`.
///
/// Parameter values may be quoted (with backslash-escaped quotes) or
/// unquoted (terminated at `;` or whitespace). Parsing proceeds left to
/// right and is tolerant of parameters other than `name`/`filename`.
pub fn parse_content_disposition(value: &str) -> Result<ContentDisposition, PipelineError> {
    let mut parts = value.splitn(2, ';');
    let disposition = parts.next().unwrap_or("").trim();
    if !disposition.eq_ignore_ascii_case("form-data") {
        return Err(PipelineError::framing(format!(
            "unsupported content-disposition: {disposition}"
        )));
    }

    let mut field_name = None;
    let mut filename = None;

    if let Some(rest) = parts.next() {
        let mut cursor = rest;
        while let Some((raw_name, raw_value, remainder)) = next_parameter(cursor) {
            match raw_name.to_ascii_lowercase().as_str() {
                "name" => field_name = Some(raw_value),
                "filename" => filename = Some(raw_value),
                _ => {}
            }
            cursor = remainder;
        }
    }

    let field_name = field_name.ok_or_else(|| {
        PipelineError::framing("content-disposition is missing required name parameter")
    })?;

    Ok(ContentDisposition { field_name, filename })
}

/// Consumes one `name=value` parameter from the head of `input`, handling
/// quoted values with backslash-escaped quotes, and returns
/// `(name, value, remainder)`.
fn next_parameter(input: &str) -> Option<(String, String, &str)> {
    let input = input.trim_start_matches([';', ' ', '\t']);
    if input.is_empty() {
        return None;
    }

    let eq = input.find('=')?;
    let name = input[..eq].trim().to_string();
    let after_eq = &input[eq + 1..];

    if let Some(rest) = after_eq.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut end_idx = rest.len();
        while let Some((idx, ch)) = chars.next() {
            if ch == '\\' {
                if let Some(&(_, escaped)) = chars.peek() {
                    value.push(escaped);
                    chars.next();
                    continue;
                }
            }
            if ch == '"' {
                end_idx = idx + 1;
                break;
            }
            value.push(ch);
        }
        let remainder = &rest[end_idx.min(rest.len())..];
        Some((name, value, remainder))
    } else {
        let end = after_eq.find(|c: char| c == ';' || c.is_whitespace()).unwrap_or(after_eq.len());
        let value = after_eq[..end].to_string();
        Some((name, value, &after_eq[end..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_header_block() {
        let block = b"Content-Disposition: form-data; name=\"u\"\r\nContent-Type: text/plain";
        let headers = parse_header_block(block).unwrap();
        assert_eq!(headers.get("content-disposition").unwrap(), "form-data; name=\"u\"");
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn ignores_colonless_lines() {
        let block = b"not-a-header-line\r\nContent-Disposition: form-data; name=\"u\"";
        let headers = parse_header_block(block).unwrap();
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn header_names_are_case_folded() {
        let block = b"CONTENT-TYPE: text/plain";
        let headers = parse_header_block(block).unwrap();
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn parses_field_disposition() {
        let cd = parse_content_disposition(r#"form-data; name="u""#).unwrap();
        assert_eq!(cd.field_name, "u");
        assert_eq!(cd.filename, None);
    }

    #[test]
    fn parses_file_disposition_with_quoted_filename() {
        let cd = parse_content_disposition(r#"form-data; name="file"; filename="a b.txt""#).unwrap();
        assert_eq!(cd.field_name, "file");
        assert_eq!(cd.filename.as_deref(), Some("a b.txt"));
    }

    #[test]
    fn empty_filename_still_marks_file_part() {
        let cd = parse_content_disposition(r#"form-data; name="file"; filename="""#).unwrap();
        assert_eq!(cd.filename.as_deref(), Some(""));
    }

    #[test]
    fn handles_backslash_escaped_quotes() {
        let cd = parse_content_disposition(r#"form-data; name="file"; filename="a \"quote\".txt""#).unwrap();
        assert_eq!(cd.filename.as_deref(), Some(r#"a "quote".txt"#));
    }

    #[test]
    fn unquoted_value_terminates_at_semicolon() {
        let cd = parse_content_disposition("form-data; name=u; filename=a.txt").unwrap();
        assert_eq!(cd.field_name, "u");
        assert_eq!(cd.filename.as_deref(), Some("a.txt"));
    }

    #[test]
    fn missing_name_is_framing_error() {
        assert!(parse_content_disposition("form-data; filename=a.txt").is_err());
    }

    #[test]
    fn missing_disposition_is_framing_error() {
        assert!(parse_content_disposition("attachment; name=u").is_err());
    }
}
