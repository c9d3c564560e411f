/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! The adaptation engine: the state machine that runs REQMOD/RESPMOD/FILEMOD
//! end to end, from the preview/content-size decision through encapsulated
//! offset arithmetic, framing, and digesting.

pub mod digest;

use crate::engine::digest::RunningDigest;
use crate::error::{IcapClientError, Result};
use crate::header::HeaderInformation;
use crate::identity::request_identity;
use crate::mode::Mode;
use crate::options::RemoteServiceConfiguration;
use crate::request::RequestInformation;
use crate::resource::Resource;
use crate::service::ServiceInformation;
use crate::transport::{ConnectionManager, Transport};
use crate::verdict::{self, Verdict};
use crate::wire::{chunked, decode, encode};
use std::io::{Read, Seek, SeekFrom, Write};
use tokio::io::AsyncReadExt;

/// Bound on how many bytes an ICAP header envelope (or an embedded HTTP
/// header block) may occupy before parsing gives up. Guards against a
/// misbehaving or malicious peer withholding the terminating blank line.
const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Default read buffer size for streaming the resource's remainder and the
/// response body.
const STREAM_BUFFER_SIZE: usize = 8192;

/// Run one REQMOD/RESPMOD/FILEMOD exchange against an already-negotiated
/// service. Callers (the client) are responsible for the zero-length-resource
/// short circuit and for running OPTIONS first.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    mode: Mode,
    service: &ServiceInformation,
    request_info: &RequestInformation,
    resource: &mut Resource<'_>,
    server_config: &RemoteServiceConfiguration,
    connection_manager: &dyn ConnectionManager,
    compare_verify_identical_content: bool,
) -> Result<HeaderInformation> {
    if resource.length() == 0 {
        return Err(IcapClientError::invalid_input("resource length must be greater than zero at engine entry"));
    }

    let tag = request_identity(mode.method_name(), request_info.request_source());
    log::debug!("{}", crate::identity::tagged(&tag, format!("starting {mode} for {:?}", resource.name())));

    let server_preview = server_config.preview_size();
    let capped_preview = request_info
        .preview_override()
        .map(|p| p.min(server_preview))
        .unwrap_or(server_preview);
    let preview = (capped_preview as u64).min(resource.length()) as usize;

    let mut transport = connection_manager
        .connect(
            service.host(),
            service.port(),
            service.service_name(),
            service.secure(),
            request_info.connect_timeout(),
            request_info.read_timeout(),
        )
        .await
        .map_err(IcapClientError::IoError)?;

    let result = run_on_transport(
        mode,
        service,
        request_info,
        resource,
        preview,
        transport.as_mut(),
        compare_verify_identical_content,
        &tag,
    )
    .await;

    let _ = transport.close().await;
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_on_transport(
    mode: Mode,
    service: &ServiceInformation,
    request_info: &RequestInformation,
    resource: &mut Resource<'_>,
    preview: usize,
    transport: &mut dyn Transport,
    compare_verify_identical_content: bool,
    tag: &str,
) -> Result<HeaderInformation> {
    let envelope = encode::build_request(mode, service, request_info, resource.name(), resource.length(), preview);

    let mut preview_bytes = vec![0u8; preview];
    read_resource_exact(resource, &mut preview_bytes).await?;
    let mut input_digest = RunningDigest::new();
    input_digest.update(&preview_bytes);

    let ieof = resource.length() <= preview as u64;
    let chunk = chunked::encode_chunk(&preview_bytes, ieof);

    transport.write(&envelope).await.map_err(IcapClientError::IoError)?;
    transport.write(&chunk).await.map_err(IcapClientError::IoError)?;
    transport.flush().await.map_err(IcapClientError::IoError)?;
    log::trace!(
        "{}",
        crate::identity::tagged(tag, format!("sent preview of {} byte(s), ieof={ieof}", preview_bytes.len()))
    );

    let headers = if ieof {
        read_envelope(transport).await?
    } else {
        let headers = read_envelope(transport).await?;
        match headers.status() {
            100 => {
                log::trace!("{}", crate::identity::tagged(tag, "server requested remainder"));
                send_remainder(resource, preview, transport, &mut input_digest).await?;
                read_envelope(transport).await?
            }
            200 | 204 => headers,
            404 => return Err(IcapClientError::not_found("ICAP Service not found")),
            other => {
                let reason = headers.reason().to_string();
                return Err(IcapClientError::unknown_response(other, reason, headers));
            }
        }
    };

    finalize(mode, request_info, headers, input_digest, resource.length(), transport, compare_verify_identical_content, tag).await
}

/// Read exactly one ICAP response envelope (status line + headers,
/// terminated by a blank line) and parse it.
async fn read_envelope(transport: &mut dyn Transport) -> Result<HeaderInformation> {
    let raw = transport
        .read_until(b"\r\n\r\n", MAX_HEADER_SIZE)
        .await
        .map_err(IcapClientError::IoError)?;
    decode::parse_response(&raw).map_err(|e| IcapClientError::invalid_input(format!("malformed ICAP response: {e}")))
}

async fn send_remainder(
    resource: &mut Resource<'_>,
    preview: usize,
    transport: &mut dyn Transport,
    input_digest: &mut RunningDigest,
) -> Result<()> {
    let mut remaining = resource.length() - preview as u64;
    let mut buf = vec![0u8; STREAM_BUFFER_SIZE];
    while remaining > 0 {
        let to_read = remaining.min(STREAM_BUFFER_SIZE as u64) as usize;
        read_resource_exact(resource, &mut buf[..to_read]).await?;
        input_digest.update(&buf[..to_read]);
        let chunk = chunked::encode_chunk(&buf[..to_read], false);
        transport.write(&chunk).await.map_err(IcapClientError::IoError)?;
        remaining -= to_read as u64;
    }
    transport.write(b"0\r\n\r\n").await.map_err(IcapClientError::IoError)?;
    transport.flush().await.map_err(IcapClientError::IoError)?;
    Ok(())
}

async fn read_resource_exact(resource: &mut Resource<'_>, buf: &mut [u8]) -> Result<()> {
    resource
        .reader_pin_mut()
        .read_exact(buf)
        .await
        .map_err(IcapClientError::IoError)?;
    Ok(())
}

/// Dispatch on the final response status, read the body when one is
/// expected, and hand the result to the verdict interpreter.
#[allow(clippy::too_many_arguments)]
async fn finalize(
    mode: Mode,
    request_info: &RequestInformation,
    mut headers: HeaderInformation,
    input_digest: RunningDigest,
    resource_length: u64,
    transport: &mut dyn Transport,
    compare_verify_identical_content: bool,
    tag: &str,
) -> Result<HeaderInformation> {
    decode::strip_statusline(&mut headers);

    let request_digest_hex = input_digest.finish_hex();
    headers.push("X-Request-Message-Digest", request_digest_hex.clone());

    match headers.status() {
        204 => run_verdict(headers, None, compare_verify_identical_content),
        200 => {
            let has_encapsulated = headers.get("Encapsulated").is_some();
            let should_read_body = has_encapsulated
                && match mode {
                    Mode::Reqmod => request_info.allow_204() != Some(false),
                    Mode::Respmod | Mode::Filemod => true,
                };

            if !has_encapsulated {
                log::warn!(
                    "{}",
                    crate::identity::tagged(tag, "200 OK carried no Encapsulated header; returning headers without a body")
                );
                return run_verdict(headers, None, compare_verify_identical_content);
            }

            if !should_read_body {
                return run_verdict(headers, None, compare_verify_identical_content);
            }

            let (headers, body) =
                read_body(mode, headers, resource_length, transport, compare_verify_identical_content, &request_digest_hex).await?;
            run_verdict(headers, body.as_deref(), compare_verify_identical_content)
        }
        other => {
            let reason = headers.reason().to_string();
            Err(IcapClientError::unknown_response(other, reason, headers))
        }
    }
}

fn run_verdict(headers: HeaderInformation, body: Option<&[u8]>, compare_verify_identical_content: bool) -> Result<HeaderInformation> {
    match verdict::interpret(&headers, body, compare_verify_identical_content) {
        Verdict::Clean => Ok(headers),
        Verdict::ThreatFound(message) => Err(IcapClientError::ContentBlocked { message, headers }),
        Verdict::NotIdentical => Err(IcapClientError::ContentBlocked {
            message: "content modified: response digest does not match request digest".to_string(),
            headers,
        }),
    }
}

/// Stream the encapsulated response body off the wire into a scratch temp
/// file while teeing through a digest, then read it back for the verdict
/// interpreter. The file is deleted (by `tempfile`'s `Drop`) on every exit
/// path, regardless of verdict.
async fn read_body(
    mode: Mode,
    mut headers: HeaderInformation,
    resource_length: u64,
    transport: &mut dyn Transport,
    compare_verify_identical_content: bool,
    request_digest_hex: &str,
) -> Result<(HeaderInformation, Option<Vec<u8>>)> {
    let encapsulated_value = headers.get("Encapsulated").unwrap_or_default().to_string();
    let sections = parse_encapsulated_sections(&encapsulated_value);
    let body_tag = format!("{}-body", mode.encapsulated_tag());

    let mut has_body = false;
    for (i, (name, offset)) in sections.iter().enumerate() {
        if name == "null-body" {
            break;
        }
        if name.ends_with("-hdr") {
            // An embedded HTTP header block precedes the body; it's
            // terminated by its own blank line, same as the ICAP envelope.
            // Its span may be zero (server declares the section but wrote
            // no bytes for it), in which case there's nothing to consume.
            let span = sections.get(i + 1).map(|(_, next)| next.saturating_sub(*offset)).unwrap_or(0);
            if span > 0 {
                let _ = transport
                    .read_until(b"\r\n\r\n", MAX_HEADER_SIZE)
                    .await
                    .map_err(IcapClientError::IoError)?;
            }
            continue;
        }
        if name.ends_with("-body") {
            has_body = true;
            let _ = &body_tag; // exact tag is informational; any body section is streamed the same way
            break;
        }
    }

    if !has_body {
        return Ok((headers, None));
    }

    let mut temp_file = tempfile::NamedTempFile::new().map_err(IcapClientError::IoError)?;
    let mut output_digest = RunningDigest::new();
    let mut decoder = chunked::ChunkedDecoder::new();
    let mut pending = Vec::new();
    let mut read_buf = vec![0u8; STREAM_BUFFER_SIZE];
    let mut total_written: u64 = 0;
    let mut framing_ok = true;

    while !decoder.is_complete() {
        let n = transport.read_exact_into(&mut read_buf).await.map_err(IcapClientError::IoError)?;
        if n == 0 {
            framing_ok = false;
            break;
        }
        pending.extend_from_slice(&read_buf[..n]);
        let (decoded, consumed) = decoder
            .decode(&pending)
            .map_err(|e| IcapClientError::invalid_input(format!("malformed response body framing: {e}")))?;
        pending.drain(..consumed);
        if !decoded.is_empty() {
            temp_file.write_all(&decoded).map_err(IcapClientError::IoError)?;
            output_digest.update(&decoded);
            total_written += decoded.len() as u64;
        }
    }

    if framing_ok {
        let response_digest_hex = output_digest.finish_hex();
        headers.push("X-Response-Message-Digest", response_digest_hex.clone());
        if compare_verify_identical_content {
            let identical = resource_length == total_written && request_digest_hex == response_digest_hex;
            headers.push("X-Identical-Content", if identical { "true" } else { "false" });
        }
    }

    temp_file.as_file_mut().seek(SeekFrom::Start(0)).map_err(IcapClientError::IoError)?;
    let mut body_content = Vec::new();
    temp_file.as_file_mut().read_to_end(&mut body_content).map_err(IcapClientError::IoError)?;
    // `temp_file` drops here, unlinking the backing file regardless of verdict.

    Ok((headers, Some(body_content)))
}

/// Parse an `Encapsulated` header value into `(section-name, offset)`
/// pairs, ordered by offset ascending.
fn parse_encapsulated_sections(value: &str) -> Vec<(String, usize)> {
    let mut sections: Vec<(String, usize)> = value
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            let (name, offset) = part.split_once('=')?;
            let offset: usize = offset.trim().parse().ok()?;
            Some((name.trim().to_string(), offset))
        })
        .collect();
    sections.sort_by_key(|(_, offset)| *offset);
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceInformation;
    use crate::transport::StreamTransport;
    use std::time::Duration;

    #[test]
    fn parses_and_orders_encapsulated_sections() {
        let sections = parse_encapsulated_sections("req-hdr=0, res-hdr=120, res-body=245");
        assert_eq!(
            sections,
            vec![
                ("req-hdr".to_string(), 0),
                ("res-hdr".to_string(), 120),
                ("res-body".to_string(), 245),
            ]
        );
    }

    #[test]
    fn null_body_parses_as_its_own_section() {
        let sections = parse_encapsulated_sections("null-body=0");
        assert_eq!(sections, vec![("null-body".to_string(), 0)]);
    }

    use tokio::io::AsyncWriteExt;

    async fn read_until_contains(stream: &mut tokio::io::DuplexStream, needle: &str) -> String {
        let mut acc = Vec::new();
        let mut buf = vec![0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "stream closed before {needle:?} was seen");
            acc.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&acc).to_string();
            if text.contains(needle) {
                return text;
            }
        }
    }


    fn service() -> ServiceInformation {
        ServiceInformation::new("127.0.0.1", 1344, "avscan")
    }

    fn config(preview: usize) -> RemoteServiceConfiguration {
        let mut headers = HeaderInformation::new(200, "OK");
        headers.push("Preview", preview.to_string());
        headers.push("Methods", "REQMOD, RESPMOD");
        headers.push("Allow", "204");
        crate::options::parse_options_response(headers).unwrap()
    }

    #[tokio::test]
    async fn clean_small_file_goes_straight_to_ieof_and_204() {
        let (mut server, client) = tokio::io::duplex(4096);
        let mut transport = StreamTransport::new(client, Duration::from_secs(1));

        let server_task = tokio::spawn(async move {
            let sent = read_until_contains(&mut server, "0; ieof\r\n\r\n").await;
            assert!(sent.contains("a\r\nhello\nwrld\r\n0; ieof\r\n\r\n"));
            server.write_all(b"ICAP/1.0 204 No Content\r\n\r\n").await.unwrap();
        });

        let mut resource = Resource::new("file.bin", 10, std::io::Cursor::new(b"hello\nwrld".to_vec())).unwrap();
        let request_info = RequestInformation::new();
        let headers = run_on_transport(
            Mode::Reqmod,
            &service(),
            &request_info,
            &mut resource,
            10,
            &mut transport,
            false,
            "test",
        )
        .await
        .unwrap();

        assert_eq!(headers.status(), 204);
        assert!(headers.get("X-Request-Message-Digest").is_some());
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn continue_then_remainder_path() {
        let (mut server, client) = tokio::io::duplex(4096);
        let mut transport = StreamTransport::new(client, Duration::from_secs(1));

        let server_task = tokio::spawn(async move {
            let first = read_until_contains(&mut server, "4\r\nhell\r\n0\r\n\r\n").await;
            assert!(first.contains("4\r\nhell\r\n0\r\n\r\n"));
            server.write_all(b"ICAP/1.0 100 Continue\r\n\r\n").await.unwrap();

            let second = read_until_contains(&mut server, "0\r\n\r\n").await;
            assert!(second.starts_with("6\r\n"));
            assert_eq!(&second[3..9], "o\nwrld");
            server.write_all(b"ICAP/1.0 204 No Content\r\n\r\n").await.unwrap();
        });

        let mut resource = Resource::new("file.bin", 10, std::io::Cursor::new(b"hello\nwrld".to_vec())).unwrap();
        let request_info = RequestInformation::new();
        let headers = run_on_transport(
            Mode::Reqmod,
            &service(),
            &request_info,
            &mut resource,
            4,
            &mut transport,
            false,
            "test",
        )
        .await
        .unwrap();

        assert_eq!(headers.status(), 204);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn infection_body_takes_priority_over_header() {
        let (mut server, client) = tokio::io::duplex(4096);
        let mut transport = StreamTransport::new(client, Duration::from_secs(1));

        let server_task = tokio::spawn(async move {
            let _ = read_until_contains(&mut server, "0; ieof\r\n\r\n").await;
            let body = b"EICAR found";
            let response = format!(
                "ICAP/1.0 200 OK\r\nX-Virus-ID: EICAR-Test-File\r\nEncapsulated: res-hdr=0, res-body=0\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
                body.len(),
                std::str::from_utf8(body).unwrap()
            );
            server.write_all(response.as_bytes()).await.unwrap();
        });

        let mut resource = Resource::new("file.bin", 3, std::io::Cursor::new(b"abc".to_vec())).unwrap();
        let request_info = RequestInformation::new();
        let err = run_on_transport(
            Mode::Respmod,
            &service(),
            &request_info,
            &mut resource,
            3,
            &mut transport,
            false,
            "test",
        )
        .await
        .unwrap_err();

        match err {
            IcapClientError::ContentBlocked { message, .. } => assert_eq!(message, "EICAR found"),
            other => panic!("expected ContentBlocked, got {other:?}"),
        }
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn service_not_found_surfaces_as_io_error() {
        let (mut server, client) = tokio::io::duplex(4096);
        let mut transport = StreamTransport::new(client, Duration::from_secs(1));

        let server_task = tokio::spawn(async move {
            let _ = read_until_contains(&mut server, "4\r\nhell\r\n0\r\n\r\n").await;
            server.write_all(b"ICAP/1.0 404 ICAP Service Not Found\r\n\r\n").await.unwrap();
        });

        let mut resource = Resource::new("file.bin", 10, std::io::Cursor::new(b"hello\nwrld".to_vec())).unwrap();
        let request_info = RequestInformation::new();
        let err = run_on_transport(
            Mode::Reqmod,
            &service(),
            &request_info,
            &mut resource,
            4,
            &mut transport,
            false,
            "test",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IcapClientError::IoError(_)));
        assert!(!matches!(err, IcapClientError::UnknownResponse { .. }));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_status_surfaces_as_unknown_response() {
        let (mut server, client) = tokio::io::duplex(4096);
        let mut transport = StreamTransport::new(client, Duration::from_secs(1));

        let server_task = tokio::spawn(async move {
            let _ = read_until_contains(&mut server, "0; ieof\r\n\r\n").await;
            server.write_all(b"ICAP/1.0 500 Internal Server Error\r\n\r\n").await.unwrap();
        });

        let mut resource = Resource::new("file.bin", 3, std::io::Cursor::new(b"abc".to_vec())).unwrap();
        let request_info = RequestInformation::new();
        let err = run_on_transport(
            Mode::Reqmod,
            &service(),
            &request_info,
            &mut resource,
            3,
            &mut transport,
            false,
            "test",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IcapClientError::UnknownResponse { status: 500, .. }));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn options_config_roundtrip_feeds_effective_preview() {
        let cfg = config(4);
        assert_eq!(cfg.preview_size(), 4);
        assert!(cfg.supports(Mode::Reqmod));
    }

    #[tokio::test]
    async fn header_only_block_with_no_body_section_still_blocks() {
        let (mut server, client) = tokio::io::duplex(4096);
        let mut transport = StreamTransport::new(client, Duration::from_secs(1));

        let server_task = tokio::spawn(async move {
            let _ = read_until_contains(&mut server, "0; ieof\r\n\r\n").await;
            server
                .write_all(b"ICAP/1.0 200 OK\r\nX-Blocked: Policy Violation\r\nEncapsulated: null-body=0\r\n\r\n")
                .await
                .unwrap();
        });

        let mut resource = Resource::new("file.bin", 3, std::io::Cursor::new(b"abc".to_vec())).unwrap();
        let request_info = RequestInformation::new();
        let err = run_on_transport(
            Mode::Respmod,
            &service(),
            &request_info,
            &mut resource,
            3,
            &mut transport,
            false,
            "test",
        )
        .await
        .unwrap_err();

        match err {
            IcapClientError::ContentBlocked { message, .. } => assert_eq!(message, "Policy Violation"),
            other => panic!("expected ContentBlocked, got {other:?}"),
        }
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn non_identical_returned_content_is_blocked_when_comparison_enabled() {
        let (mut server, client) = tokio::io::duplex(4096);
        let mut transport = StreamTransport::new(client, Duration::from_secs(1));

        let server_task = tokio::spawn(async move {
            let _ = read_until_contains(&mut server, "0; ieof\r\n\r\n").await;
            let body = b"abd";
            let response = format!(
                "ICAP/1.0 200 OK\r\nEncapsulated: res-hdr=0, res-body=0\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
                body.len(),
                std::str::from_utf8(body).unwrap()
            );
            server.write_all(response.as_bytes()).await.unwrap();
        });

        let mut resource = Resource::new("file.bin", 3, std::io::Cursor::new(b"abc".to_vec())).unwrap();
        let request_info = RequestInformation::new();
        let err = run_on_transport(
            Mode::Respmod,
            &service(),
            &request_info,
            &mut resource,
            3,
            &mut transport,
            true,
            "test",
        )
        .await
        .unwrap_err();

        match err {
            IcapClientError::ContentBlocked { message, headers } => {
                assert!(message.contains("does not match"));
                assert_eq!(headers.get("X-Identical-Content"), Some("false"));
            }
            other => panic!("expected ContentBlocked, got {other:?}"),
        }
        server_task.await.unwrap();
    }
}
