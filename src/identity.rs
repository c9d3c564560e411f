/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Short per-request correlation tags for logs and temp-file names.

use fnv::FnvHasher;
use std::hash::Hasher;
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a short, best-effort-unique identifier for one `validate` call,
/// suitable for log prefixes and temp-file names. Collisions only degrade
/// diagnostics, never correctness.
pub fn request_identity(mode: &str, request_source: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let mut hasher = FnvHasher::default();
    hasher.write(now.to_string().as_bytes());
    hasher.write(b"|");
    hasher.write(mode.as_bytes());
    hasher.write(b"|");
    hasher.write(request_source.as_bytes());

    format!("{:016x}", hasher.finish())
}

/// Prefix a log line with a request's correlation tag: `"<tag> - <line>"`.
pub fn tagged(tag: &str, line: impl AsRef<str>) -> String {
    format!("{tag} - {}", line.as_ref())
}
