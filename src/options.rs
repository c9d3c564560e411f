/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! OPTIONS negotiation: probe a remote ICAP service once and cache what it
//! told us.
//!
//! The header-name vocabulary (`Preview`, `Allow`, `Methods`) is the
//! standard RFC 3507 OPTIONS response vocabulary, parsed here instead of
//! constructed.

use crate::error::{IcapClientError, Result};
use crate::header::HeaderInformation;
use crate::mode::Mode;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default preview size used when the server's `Preview` header is absent
/// or unparsable.
pub const DEFAULT_PREVIEW_SIZE: usize = 1024;

/// Cached result of an OPTIONS probe against a remote service.
#[derive(Debug, Clone)]
pub struct RemoteServiceConfiguration {
    negotiated_at: u64,
    methods: Vec<Mode>,
    preview_size: usize,
    allow_204: bool,
    headers: HeaderInformation,
}

impl RemoteServiceConfiguration {
    /// Unix timestamp (seconds) of when this configuration was negotiated.
    pub fn negotiated_at(&self) -> u64 {
        self.negotiated_at
    }

    /// Adaptation methods the server advertised support for.
    pub fn methods(&self) -> &[Mode] {
        &self.methods
    }

    /// True if `mode` was among the server's advertised `Methods`.
    pub fn supports(&self, mode: Mode) -> bool {
        self.methods.contains(&mode)
    }

    /// Server-advertised preview size (defaults to [`DEFAULT_PREVIEW_SIZE`]
    /// if the header was absent or unparsable).
    pub fn preview_size(&self) -> usize {
        self.preview_size
    }

    /// True if the server's `Allow` header's first token was `204`.
    pub fn allow_204(&self) -> bool {
        self.allow_204
    }

    /// The full raw OPTIONS response headers, for diagnostics.
    pub fn headers(&self) -> &HeaderInformation {
        &self.headers
    }
}

/// Parse an OPTIONS response envelope into a [`RemoteServiceConfiguration`].
/// The caller is responsible for having already confirmed `status == 200`
/// (anything else is an I/O-level negotiation failure).
pub fn parse_options_response(headers: HeaderInformation) -> Result<RemoteServiceConfiguration> {
    let preview_size = headers
        .get("Preview")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or_else(|| {
            log::warn!("OPTIONS response had no parsable Preview header; defaulting to {DEFAULT_PREVIEW_SIZE}");
            DEFAULT_PREVIEW_SIZE
        });

    let allow_204 = headers
        .get("Allow")
        .and_then(|v| v.split(',').next())
        .map(|token| token.trim().eq_ignore_ascii_case("204"))
        .unwrap_or(false);

    let methods = parse_methods(headers.get("Methods").unwrap_or(""))?;

    let negotiated_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

    Ok(RemoteServiceConfiguration {
        negotiated_at,
        methods,
        preview_size,
        allow_204,
        headers,
    })
}

fn parse_methods(raw: &str) -> Result<Vec<Mode>> {
    let mut methods = Vec::new();
    for token in raw.split([',', ' ']).map(str::trim).filter(|t| !t.is_empty()) {
        let mode = match token.to_ascii_uppercase().as_str() {
            "REQMOD" => Mode::Reqmod,
            "RESPMOD" => Mode::Respmod,
            "FILEMOD" => Mode::Filemod,
            other => {
                return Err(IcapClientError::invalid_input(format!(
                    "OPTIONS advertised unknown method {other:?}"
                )))
            }
        };
        methods.push(mode);
    }
    Ok(methods)
}
