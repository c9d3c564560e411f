/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Identity of the remote ICAP service.

/// Immutable identity of a remote ICAP service: where it lives and which
/// path segment names it. Created by the caller and held for the client's
/// lifetime.
#[derive(Debug, Clone)]
pub struct ServiceInformation {
    host: String,
    port: u16,
    service_name: String,
    secure: bool,
}

impl ServiceInformation {
    /// Construct a new service identity.
    pub fn new(host: impl Into<String>, port: u16, service_name: impl Into<String>) -> Self {
        ServiceInformation {
            host: host.into(),
            port,
            service_name: service_name.into(),
            secure: false,
        }
    }

    /// Mark the connection to this service as TLS-wrapped. Purely
    /// informational here: the actual TLS handshake is the connection
    /// manager's responsibility.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Remote host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// ICAP service path segment, e.g. `"avscan"`.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Whether the transport to this service is expected to be secured.
    pub fn secure(&self) -> bool {
        self.secure
    }
}
