/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Error taxonomy for the ICAP adaptation client.

use crate::header::HeaderInformation;

/// Errors produced by an ICAP client call.
#[derive(Debug, thiserror::Error)]
pub enum IcapClientError {
    /// The caller supplied an invalid resource, request, or configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A transport-level failure: connect/read/write/timeout, or an OPTIONS
    /// probe that did not return 200.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The server returned a status code the engine does not know how to
    /// interpret (not 100/200/204/404).
    #[error("unexpected ICAP response: {status} {reason}")]
    UnknownResponse {
        /// ICAP status code.
        status: u16,
        /// ICAP reason phrase.
        reason: String,
        /// Full response headers, for diagnostics.
        headers: HeaderInformation,
    },

    /// The adaptation service identified the content as a threat, or (when
    /// content-identity comparison is enabled) as modified.
    #[error("content blocked: {message}")]
    ContentBlocked {
        /// Human-readable explanation extracted from the verdict.
        message: String,
        /// Full response headers.
        headers: HeaderInformation,
    },
}

impl IcapClientError {
    /// Build an [`IcapClientError::InvalidInput`] from any displayable message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        IcapClientError::InvalidInput(msg.into())
    }

    /// Build an [`IcapClientError::UnknownResponse`] from a parsed status line.
    pub fn unknown_response(status: u16, reason: impl Into<String>, headers: HeaderInformation) -> Self {
        IcapClientError::UnknownResponse {
            status,
            reason: reason.into(),
            headers,
        }
    }

    /// Build the [`IcapClientError::IoError`] surfaced for an ICAP 404 (the
    /// remote service reported it has no such resource).
    pub fn not_found(message: impl Into<String>) -> Self {
        IcapClientError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, message.into()))
    }

    /// True if the failure is plausibly transient (I/O only; nothing else is retried).
    pub fn is_retryable(&self) -> bool {
        matches!(self, IcapClientError::IoError(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IcapClientError>;
