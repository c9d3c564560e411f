/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! The payload submitted for adaptation.

use crate::error::{IcapClientError, Result};
use tokio::io::AsyncRead;

/// A resource to validate: a logical name, a declared length, and a
/// single-pass readable byte source. The engine reads the source exactly
/// once, in order.
pub struct Resource<'a> {
    name: String,
    length: u64,
    reader: std::pin::Pin<Box<dyn AsyncRead + Send + 'a>>,
}

impl<'a> Resource<'a> {
    /// Build a resource from a name, a declared length, and a reader.
    /// `length` must be accurate: it drives preview-size selection and
    /// `Encapsulated` offset arithmetic, and is not re-derived from the
    /// reader.
    pub fn new(name: impl Into<String>, length: u64, reader: impl AsyncRead + Send + 'a) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IcapClientError::invalid_input("resource name must not be empty"));
        }
        Ok(Resource {
            name,
            length,
            reader: Box::pin(reader),
        })
    }

    /// The resource's logical name (used in the inner HTTP request line,
    /// percent-encoded).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared length in bytes. Zero-length resources are handled by the
    /// caller before the engine is invoked (see [`crate::client::IcapClient::validate`]).
    pub fn length(&self) -> u64 {
        self.length
    }

    pub(crate) fn reader_pin_mut(&mut self) -> std::pin::Pin<&mut (dyn AsyncRead + Send + 'a)> {
        self.reader.as_mut()
    }
}
