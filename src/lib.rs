/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! G3 ICAP Client Library
//!
//! An async client for the Internet Content Adaptation Protocol (RFC 3507),
//! used to submit resources to a remote adaptation service (anti-malware or
//! content-policy engines) and interpret their verdicts.
//!
//! # Features
//!
//! - **Async I/O**: built on the tokio runtime, with the byte transport
//!   itself injected as a trait so callers own pooling and TLS.
//! - **Full preview handshake**: preview-then-continue, `ieof` framing, and
//!   exact `Encapsulated` offset arithmetic.
//! - **Vendor-agnostic verdicts**: recognizes the threat-signaling headers
//!   used by ClamAV, Sophos, Kaspersky, McAfee, Trend Micro, ESET, and C-ICAP.
//! - **Content-identity comparison**: optional digesting of submitted vs.
//!   returned content.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use g3_icap_client::{IcapClient, Mode, Resource, ServiceInformation};
//! # use g3_icap_client::transport::{ConnectionManager, Transport};
//! # async fn run(connection_manager: impl ConnectionManager + 'static) -> g3_icap_client::Result<()> {
//! let service = ServiceInformation::new("icap.example.internal", 1344, "avscan");
//! let client = IcapClient::new(service, connection_manager);
//!
//! let data = b"hello world".to_vec();
//! let mut resource = Resource::new("upload.bin", data.len() as u64, std::io::Cursor::new(data))?;
//! let headers = client.validate(Mode::Reqmod, None, &mut resource).await?;
//! println!("adaptation result: {} {}", headers.status(), headers.reason());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![deny(clippy::missing_safety_doc)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unreachable)]

pub mod client;
pub mod engine;
pub mod error;
pub mod header;
pub mod identity;
pub mod mode;
pub mod options;
pub mod request;
pub mod resource;
pub mod service;
pub mod transport;
pub mod verdict;
pub mod wire;

pub use client::IcapClient;
pub use error::{IcapClientError, Result};
pub use header::HeaderInformation;
pub use mode::Mode;
pub use options::RemoteServiceConfiguration;
pub use request::RequestInformation;
pub use resource::Resource;
pub use service::ServiceInformation;
pub use verdict::Verdict;
