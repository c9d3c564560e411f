/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Per-call request parameters.

use std::time::Duration;

/// Header names a caller may not set directly because the engine controls
/// them to keep the wire protocol correct.
pub const RESERVED_HEADER_NAMES: [&str; 6] = ["Host", "Connection", "User-Agent", "Preview", "Encapsulated", "Allow"];

fn is_reserved(name: &str) -> bool {
    RESERVED_HEADER_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Per-call parameters for an ICAP request: timeouts, negotiation
/// preferences, and caller-supplied headers.
#[derive(Debug, Clone)]
pub struct RequestInformation {
    api_version: String,
    user_agent: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    allow_204: Option<bool>,
    custom_headers: Vec<(String, String)>,
    request_source: String,
    preview_override: Option<usize>,
}

impl Default for RequestInformation {
    fn default() -> Self {
        RequestInformation {
            api_version: "1.0".to_string(),
            user_agent: concat!("g3-icap-client/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            allow_204: None,
            custom_headers: Vec::new(),
            request_source: "localhost".to_string(),
            preview_override: None,
        }
    }
}

impl RequestInformation {
    /// Start from defaults: API version `1.0`, a `g3-icap-client/<version>`
    /// user agent, 10s connect / 30s read timeouts, no explicit 204
    /// preference (auto), and `Host: localhost` on the inner HTTP message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the ICAP protocol version string sent on the request line.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Override the `User-Agent` header.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Override the transport-connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the per-read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Explicitly opt in (`true`) or out (`false`) of the `Allow: 204` fast
    /// path. Leave unset to let the engine decide from server capabilities.
    pub fn with_allow_204(mut self, allow: bool) -> Self {
        self.allow_204 = Some(allow);
        self
    }

    /// Set the `Host` value on the inner (encapsulated) HTTP message.
    pub fn with_request_source(mut self, source: impl Into<String>) -> Self {
        self.request_source = source.into();
        self
    }

    /// Cap the effective preview size below whatever the server advertises.
    /// Has no effect if the value exceeds the server's own preview size.
    pub fn with_preview_override(mut self, preview: usize) -> Self {
        self.preview_override = Some(preview);
        self
    }

    /// Add a custom header to the outgoing ICAP request. Rejected (returns
    /// `Err` with the offending name) if it collides case-insensitively
    /// with a reserved header name; callers should log and drop such
    /// attempts rather than propagate them to the wire.
    pub fn add_custom_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if is_reserved(&name) {
            return Err(name);
        }
        let value = value.into();
        let name = name.trim().to_string();
        let value = value.trim().to_string();
        if value.is_empty() {
            return Ok(self);
        }
        self.custom_headers.push((name, value));
        Ok(self)
    }

    pub(crate) fn api_version(&self) -> &str {
        &self.api_version
    }

    pub(crate) fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub(crate) fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub(crate) fn allow_204(&self) -> Option<bool> {
        self.allow_204
    }

    pub(crate) fn custom_headers(&self) -> &[(String, String)] {
        &self.custom_headers
    }

    pub(crate) fn request_source(&self) -> &str {
        &self.request_source
    }

    pub(crate) fn preview_override(&self) -> Option<usize> {
        self.preview_override
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_header_is_rejected() {
        let result = RequestInformation::new().add_custom_header("Host", "evil.example");
        assert_eq!(result.unwrap_err(), "Host");
    }

    #[test]
    fn reserved_header_check_is_case_insensitive() {
        let result = RequestInformation::new().add_custom_header("connection", "keep-alive");
        assert!(result.is_err());
    }

    #[test]
    fn empty_value_is_silently_dropped() {
        let info = RequestInformation::new().add_custom_header("X-Trace-Id", "  ").unwrap();
        assert!(info.custom_headers().is_empty());
    }

    #[test]
    fn accepted_custom_header_is_trimmed_and_kept() {
        let info = RequestInformation::new()
            .add_custom_header("X-Trace-Id", "  abc123  ")
            .unwrap();
        assert_eq!(info.custom_headers(), &[("X-Trace-Id".to_string(), "abc123".to_string())]);
    }
}
