/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! The top-level client: binds a [`ServiceInformation`] and a
//! [`ConnectionManager`] together and exposes the public `options`/`validate`
//! contract. Composes the OPTIONS negotiator ([`crate::options`]) and the
//! adaptation engine ([`crate::engine`]); holds no wire-protocol logic of
//! its own.

use crate::engine;
use crate::error::{IcapClientError, Result};
use crate::header::HeaderInformation;
use crate::mode::Mode;
use crate::options::{self, RemoteServiceConfiguration};
use crate::request::RequestInformation;
use crate::resource::Resource;
use crate::service::ServiceInformation;
use crate::transport::{ConnectionManager, Transport};
use crate::wire::{decode, encode};
use arc_swap::ArcSwapOption;
use std::sync::Arc;

const OPTIONS_MAX_HEADER_SIZE: usize = 64 * 1024;

/// An ICAP client bound to one remote service.
///
/// `remote_config` is a one-shot cache cell: written once on OPTIONS
/// success, cleared on failure, read by every `validate` call. `arc-swap`
/// gives atomic read/write without a mutex around the read path, fitting a
/// value that's rarely written and often read.
pub struct IcapClient {
    service: ServiceInformation,
    connection_manager: Box<dyn ConnectionManager>,
    compare_verify_identical_content: bool,
    remote_config: ArcSwapOption<RemoteServiceConfiguration>,
}

impl IcapClient {
    /// Bind a client to `service`, dialing through `connection_manager`.
    pub fn new(service: ServiceInformation, connection_manager: impl ConnectionManager + 'static) -> Self {
        IcapClient {
            service,
            connection_manager: Box::new(connection_manager),
            compare_verify_identical_content: false,
            remote_config: ArcSwapOption::empty(),
        }
    }

    /// Enable (or disable) the `X-Identical-Content` comparison path.
    pub fn set_compare_verify_identical_content(mut self, enabled: bool) -> Self {
        self.compare_verify_identical_content = enabled;
        self
    }

    /// Probe the remote service with default request parameters. Cached
    /// after the first successful call; see [`Self::options_with`].
    pub async fn options(&self) -> Result<Arc<RemoteServiceConfiguration>> {
        self.options_with(&RequestInformation::new()).await
    }

    /// Probe the remote service, or return the cached result from a prior
    /// successful call. Lets callers negotiate with non-default timeouts
    /// before the first `validate`.
    pub async fn options_with(&self, request_info: &RequestInformation) -> Result<Arc<RemoteServiceConfiguration>> {
        if let Some(cached) = self.remote_config.load_full() {
            return Ok(cached);
        }

        let mut transport = self
            .connection_manager
            .connect(
                self.service.host(),
                self.service.port(),
                self.service.service_name(),
                self.service.secure(),
                request_info.connect_timeout(),
                request_info.read_timeout(),
            )
            .await
            .map_err(IcapClientError::IoError)?;

        let result = negotiate(transport.as_mut(), &self.service, request_info).await;
        let _ = transport.close().await;

        match result {
            Ok(config) => {
                let config = Arc::new(config);
                self.remote_config.store(Some(config.clone()));
                Ok(config)
            }
            Err(err) => {
                self.remote_config.store(None);
                Err(err)
            }
        }
    }

    /// Submit `resource` for adaptation under `mode`. `request_information`
    /// defaults when omitted. Zero-length resources short-circuit here with
    /// an empty [`HeaderInformation`]; no transport is opened for them.
    pub async fn validate(
        &self,
        mode: Mode,
        request_information: Option<&RequestInformation>,
        resource: &mut Resource<'_>,
    ) -> Result<HeaderInformation> {
        if resource.length() == 0 {
            log::debug!("validate called with a zero-length resource {:?}; returning without opening a transport", resource.name());
            return Ok(HeaderInformation::new(0, ""));
        }

        let owned_default;
        let request_info = match request_information {
            Some(info) => info,
            None => {
                owned_default = RequestInformation::new();
                &owned_default
            }
        };

        let config = self.options_with(request_info).await?;

        engine::run(
            mode,
            &self.service,
            request_info,
            resource,
            &config,
            self.connection_manager.as_ref(),
            self.compare_verify_identical_content,
        )
        .await
    }
}

async fn negotiate(
    transport: &mut dyn Transport,
    service: &ServiceInformation,
    request_info: &RequestInformation,
) -> Result<RemoteServiceConfiguration> {
    let envelope = encode::build_options_request(Mode::Reqmod, service, request_info);
    transport.write(&envelope).await.map_err(IcapClientError::IoError)?;
    transport.flush().await.map_err(IcapClientError::IoError)?;

    let raw = transport
        .read_until(b"\r\n\r\n", OPTIONS_MAX_HEADER_SIZE)
        .await
        .map_err(IcapClientError::IoError)?;
    let mut headers =
        decode::parse_response(&raw).map_err(|e| IcapClientError::invalid_input(format!("malformed OPTIONS response: {e}")))?;

    if headers.status() != 200 {
        let status = headers.status();
        let reason = headers.reason().to_string();
        return Err(IcapClientError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("OPTIONS negotiation failed: {status} {reason}"),
        )));
    }

    decode::strip_statusline(&mut headers);
    options::parse_options_response(headers)
}
