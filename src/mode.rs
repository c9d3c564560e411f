/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! ICAP adaptation modes.

/// Which ICAP method a [`crate::client::IcapClient::validate`] call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Request modification: adapt an outbound HTTP request.
    Reqmod,
    /// Response modification: adapt an inbound HTTP response.
    Respmod,
    /// File modification: adapt a standalone resource (not embedded in an
    /// HTTP message). Wire-compatible with RESPMOD except for its tag.
    Filemod,
}

impl Mode {
    /// The ICAP method name sent on the request line.
    pub fn method_name(self) -> &'static str {
        match self {
            Mode::Reqmod => "REQMOD",
            Mode::Respmod => "RESPMOD",
            Mode::Filemod => "RESPMOD",
        }
    }

    /// The tag used in `Encapsulated` section names (`req-body`, `res-body`,
    /// `file-body`).
    pub fn encapsulated_tag(self) -> &'static str {
        match self {
            Mode::Reqmod => "req",
            Mode::Respmod => "res",
            Mode::Filemod => "file",
        }
    }

    /// The service path segment this mode is conventionally mounted under.
    pub fn default_service_suffix(self) -> &'static str {
        match self {
            Mode::Reqmod => "reqmod",
            Mode::Respmod => "respmod",
            Mode::Filemod => "filemod",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method_name())
    }
}
