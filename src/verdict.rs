/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Interpret a parsed ICAP response across vendor dialects that disagree on
//! how to signal a detected threat: ClamAV, Sophos, Kaspersky, McAfee,
//! Trend Micro, ESET, and C-ICAP each use a different header to flag a
//! block, with no common standard.

use crate::header::HeaderInformation;

/// Headers whose mere presence (any value) marks the response as a threat,
/// in the priority order explanation text is drawn from.
const THREAT_HEADERS: [&str; 7] = [
    "X-Infection-Found",
    "X-Violations-Found",
    "X-Blocked",
    "X-Virus-ID",
    "X-Virus-Name",
    "X-Block-Reason",
    "X-Block-Result",
];

/// Headers checked, in order, for explanation text when no response body
/// is available.
const EXPLANATION_HEADERS: [&str; 3] = ["X-Blocked", "X-Virus-ID", "X-Virus-Name"];

/// Outcome of interpreting an ICAP adaptation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The service found nothing to object to.
    Clean,
    /// The service flagged the content; `0` carries a human-readable
    /// explanation (body content, a header value, or `"n/a"`).
    ThreatFound(String),
    /// Content-identity comparison was enabled and the returned body
    /// differs from the submitted resource.
    NotIdentical,
}

/// Interpret `headers` (and, when present, `body`: the already-decoded
/// encapsulated response body) into a [`Verdict`].
///
/// `compare_verify_identical_content` gates the `NotIdentical` branch: it
/// only applies when the caller asked for content-identity comparison.
pub fn interpret(headers: &HeaderInformation, body: Option<&[u8]>, compare_verify_identical_content: bool) -> Verdict {
    if is_threat(headers) {
        return Verdict::ThreatFound(explanation(headers, body));
    }

    if compare_verify_identical_content {
        if let Some(identical) = headers.get("X-Identical-Content") {
            if identical.eq_ignore_ascii_case("false") {
                return Verdict::NotIdentical;
            }
        }
    }

    Verdict::Clean
}

fn is_threat(headers: &HeaderInformation) -> bool {
    THREAT_HEADERS.iter().any(|name| headers.contains(name))
}

fn explanation(headers: &HeaderInformation, body: Option<&[u8]>) -> String {
    if let Some(body) = body {
        if let Ok(text) = std::str::from_utf8(body) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    for name in EXPLANATION_HEADERS {
        if let Some(value) = headers.get(name) {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    "n/a".to_string()
}
