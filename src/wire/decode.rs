/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Response-side wire decoding: ICAP status line and header block parsing.
//!
//! Parses into the case-preserving [`HeaderInformation`] multi-map instead
//! of a fixed-field struct, since callers need arbitrary vendor headers
//! (`X-Virus-ID`, `X-Blocked`, ...) that no fixed struct could anticipate.

use crate::header::HeaderInformation;

/// The synthetic header name the parser uses to stash the raw status line
/// for diagnostics. Stripped by the engine before the verdict interpreter
/// runs (see [`strip_statusline`]).
pub const STATUSLINE_HEADER: &str = "X-ICAP-Statusline";

/// Errors from parsing an ICAP response envelope. Distinct from transport
/// I/O errors: these mean bytes arrived but didn't look like ICAP.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    /// The envelope had no status line at all.
    #[error("empty ICAP response")]
    Empty,
    /// The status line wasn't `ICAP/<version> <status> <reason>`.
    #[error("malformed ICAP status line: {0}")]
    MalformedStatusLine(String),
    /// The status code wasn't a valid integer.
    #[error("invalid ICAP status code: {0}")]
    InvalidStatusCode(String),
    /// A header line had no `:` separator.
    #[error("malformed header line: {0}")]
    MalformedHeaderLine(String),
    /// The envelope was not valid UTF-8.
    #[error("non-UTF-8 response envelope")]
    InvalidEncoding,
}

/// Parse a full ICAP response envelope (status line + headers, terminated
/// by a blank line) into a [`HeaderInformation`].
///
/// `envelope` is everything up to and including the terminating `\r\n\r\n`
/// as read by [`crate::transport::Transport::read_until`]. The raw status
/// line is preserved under [`STATUSLINE_HEADER`] for diagnostics.
pub fn parse_response(envelope: &[u8]) -> Result<HeaderInformation, DecodeError> {
    let text = std::str::from_utf8(envelope).map_err(|_| DecodeError::InvalidEncoding)?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().filter(|l| !l.is_empty()).ok_or(DecodeError::Empty)?;
    let (status, reason) = parse_status_line(status_line)?;

    let mut headers = HeaderInformation::new(status, reason);
    headers.push(STATUSLINE_HEADER, status_line);

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| DecodeError::MalformedHeaderLine(line.to_string()))?;
        headers.push(name.trim(), value.trim());
    }

    Ok(headers)
}

fn parse_status_line(line: &str) -> Result<(u16, String), DecodeError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or_else(|| DecodeError::MalformedStatusLine(line.to_string()))?;
    if !version.starts_with("ICAP/") {
        return Err(DecodeError::MalformedStatusLine(line.to_string()));
    }
    let status_str = parts.next().ok_or_else(|| DecodeError::MalformedStatusLine(line.to_string()))?;
    let status: u16 = status_str
        .parse()
        .map_err(|_| DecodeError::InvalidStatusCode(status_str.to_string()))?;
    let reason = parts.next().unwrap_or("").to_string();
    Ok((status, reason))
}

/// Remove the synthetic status-line header before handing headers to the
/// verdict interpreter.
pub fn strip_statusline(headers: &mut HeaderInformation) {
    headers.remove(STATUSLINE_HEADER);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_line_and_headers() {
        let raw = b"ICAP/1.0 204 No Content\r\nISTag: \"abc\"\r\nServer: ClamAV\r\n\r\n";
        let headers = parse_response(raw).unwrap();
        assert_eq!(headers.status(), 204);
        assert_eq!(headers.reason(), "No Content");
        assert_eq!(headers.get("istag"), Some("\"abc\""));
        assert_eq!(headers.get("server"), Some("ClamAV"));
    }

    #[test]
    fn preserves_raw_status_line_as_synthetic_header() {
        let raw = b"ICAP/1.0 200 OK\r\n\r\n";
        let headers = parse_response(raw).unwrap();
        assert_eq!(headers.get(STATUSLINE_HEADER), Some("ICAP/1.0 200 OK"));
    }

    #[test]
    fn strip_removes_synthetic_header_only() {
        let raw = b"ICAP/1.0 200 OK\r\nX-Virus-ID: EICAR\r\n\r\n";
        let mut headers = parse_response(raw).unwrap();
        strip_statusline(&mut headers);
        assert!(!headers.contains(STATUSLINE_HEADER));
        assert_eq!(headers.get("x-virus-id"), Some("EICAR"));
    }

    #[test]
    fn multi_value_headers_accumulate() {
        let raw = b"ICAP/1.0 200 OK\r\nMethods: REQMOD\r\nMethods: RESPMOD\r\n\r\n";
        let headers = parse_response(raw).unwrap();
        assert_eq!(headers.get_all("methods").collect::<Vec<_>>(), vec!["REQMOD", "RESPMOD"]);
    }

    #[test]
    fn rejects_missing_status_line() {
        let raw = b"\r\n\r\n";
        assert!(matches!(parse_response(raw), Err(DecodeError::Empty)));
    }

    #[test]
    fn rejects_non_numeric_status() {
        let raw = b"ICAP/1.0 OK Nope\r\n\r\n";
        assert!(matches!(parse_response(raw), Err(DecodeError::InvalidStatusCode(_))));
    }

    #[test]
    fn rejects_header_line_without_colon() {
        let raw = b"ICAP/1.0 200 OK\r\nNotAHeader\r\n\r\n";
        assert!(matches!(parse_response(raw), Err(DecodeError::MalformedHeaderLine(_))));
    }
}
