/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Request-side wire encoding: ICAP envelope, encapsulated HTTP head, and
//! exact `Encapsulated` offset arithmetic.
//!
//! Header blocks are built first and their real lengths measured, rather
//! than assumed from a fixed estimate: an estimate is wrong whenever a
//! header block isn't exactly that size, which is always.

use crate::mode::Mode;
use crate::request::RequestInformation;
use crate::service::ServiceInformation;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

const PATH_UNSAFE: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`').add(b'#').add(b'?');

/// Build the inner HTTP request head (`req-hdr` section): a minimal request
/// line plus `Host`, terminated by a blank line included in its length.
fn build_http_request_head(resource_name: &str, host: &str) -> Vec<u8> {
    let encoded_name = utf8_percent_encode(resource_name, PATH_UNSAFE).to_string();
    let mut head = Vec::new();
    head.extend_from_slice(format!("GET /{encoded_name} HTTP/1.1\r\n").as_bytes());
    head.extend_from_slice(format!("Host: {host}\r\n").as_bytes());
    head.extend_from_slice(b"\r\n");
    head
}

/// Build the inner HTTP response head (`res-hdr` section, RESPMOD/FILEMOD
/// only): a status line plus `Content-Length`, terminated by a blank line
/// included in its length.
fn build_http_response_head(resource_length: u64) -> Vec<u8> {
    let mut len_buf = itoa::Buffer::new();
    let mut head = Vec::new();
    head.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
    head.extend_from_slice(b"Content-Length: ");
    head.extend_from_slice(len_buf.format(resource_length).as_bytes());
    head.extend_from_slice(b"\r\n");
    head.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
    head.extend_from_slice(b"\r\n");
    head
}

/// Build the full ICAP request envelope plus encapsulated HTTP head, ready
/// to be followed by the chunked body. `preview` is the effective preview
/// size already selected by the engine (`min(server_preview, resource.length)`,
/// capped by any caller override).
#[allow(clippy::too_many_arguments)]
pub fn build_request(
    mode: Mode,
    service: &ServiceInformation,
    request_info: &RequestInformation,
    resource_name: &str,
    resource_length: u64,
    preview: usize,
) -> Vec<u8> {
    let req_head = build_http_request_head(resource_name, request_info.request_source());
    let (res_head, encapsulated_header) = match mode {
        Mode::Reqmod => (None, format!("req-hdr=0, req-body={}", req_head.len())),
        Mode::Respmod | Mode::Filemod => {
            let res_head = build_http_response_head(resource_length);
            let tag = mode.encapsulated_tag();
            let header = format!(
                "req-hdr=0, {tag}-hdr={}, {tag}-body={}",
                req_head.len(),
                req_head.len() + res_head.len()
            );
            (Some(res_head), header)
        }
    };

    let mut out = Vec::new();
    out.extend_from_slice(
        format!(
            "{} icap://{}:{}/{} ICAP/{}\r\n",
            mode.method_name(),
            service.host(),
            service.port(),
            service.service_name(),
            request_info.api_version()
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("Host: {}:{}\r\n", service.host(), service.port()).as_bytes());
    out.extend_from_slice(b"Connection: close\r\n");
    out.extend_from_slice(format!("User-Agent: {}\r\n", request_info.user_agent()).as_bytes());
    if let Some(allow) = request_info.allow_204() {
        if allow {
            out.extend_from_slice(b"Allow: 204\r\n");
        }
    } else {
        out.extend_from_slice(b"Allow: 204\r\n");
    }
    for (name, value) in request_info.custom_headers() {
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(format!("Preview: {preview}\r\n").as_bytes());
    out.extend_from_slice(format!("Encapsulated: {encapsulated_header}\r\n").as_bytes());
    out.extend_from_slice(b"\r\n");

    out.extend_from_slice(&req_head);
    if let Some(res_head) = &res_head {
        out.extend_from_slice(res_head);
    }

    out
}

/// Build the OPTIONS request for a service.
pub fn build_options_request(mode: Mode, service: &ServiceInformation, request_info: &RequestInformation) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(
        format!(
            "OPTIONS icap://{}:{}/{} ICAP/{}\r\n",
            service.host(),
            service.port(),
            service.service_name(),
            request_info.api_version()
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("Host: {}:{}\r\n", service.host(), service.port()).as_bytes());
    out.extend_from_slice(b"Connection: close\r\n");
    out.extend_from_slice(format!("User-Agent: {}\r\n", request_info.user_agent()).as_bytes());
    let _ = mode; // OPTIONS is method-agnostic; kept for call-site symmetry/logging.
    out.extend_from_slice(b"Encapsulated: null-body=0\r\n");
    out.extend_from_slice(b"\r\n");
    out
}
