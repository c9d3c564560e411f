/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! HTTP chunked transfer-encoding framing for encapsulated ICAP bodies.
//!
//! All encapsulated HTTP bodies in an ICAP message use chunked
//! transfer-encoding (RFC 3507 S4.3). This module decodes that framing
//! incrementally from a byte stream and encodes it for the engine's writes.

use bytes::Bytes;
use std::str;

/// Maximum chunk size this parser accepts, guarding against a malicious or
/// corrupt length field driving unbounded memory use.
const MAX_CHUNK_SIZE: usize = 1024 * 1024 * 1024;

/// Incremental chunked-encoding decoder.
#[derive(Debug, Clone)]
pub struct ChunkedDecoder {
    state: State,
    current_chunk_size: usize,
    current_chunk_read: usize,
    /// Set once an `ieof` marker is seen on the terminating chunk, signalling
    /// the sender ended the body early during preview.
    saw_ieof: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    ReadingSize,
    ReadingChunk,
    ReadingTrailers,
    Complete,
}

/// Errors in the chunk framing itself, distinct from transport I/O errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChunkedDecodeError {
    #[error("invalid chunk size encoding: {0}")]
    InvalidChunkSize(String),
    #[error("invalid chunked encoding format")]
    InvalidEncoding,
    #[error("chunk size too large: {0}")]
    ChunkSizeTooLarge(usize),
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    /// A fresh decoder at the start of a chunked body.
    pub fn new() -> Self {
        ChunkedDecoder {
            state: State::ReadingSize,
            current_chunk_size: 0,
            current_chunk_read: 0,
            saw_ieof: false,
        }
    }

    /// Feed more bytes, returning `(decoded_body_bytes, input_bytes_consumed)`.
    /// Call repeatedly as more input arrives until [`Self::is_complete`].
    pub fn decode(&mut self, input: &[u8]) -> Result<(Vec<u8>, usize), ChunkedDecodeError> {
        let mut output = Vec::new();
        let mut consumed = 0;
        let mut pos = 0;

        while pos < input.len() {
            match self.state {
                State::ReadingSize => {
                    let Some(crlf_pos) = find_crlf(&input[pos..]) else {
                        break;
                    };
                    let line = str::from_utf8(&input[pos..pos + crlf_pos])
                        .map_err(|_| ChunkedDecodeError::InvalidEncoding)?;
                    let size_str = line.split(';').next().unwrap_or(line).trim();
                    self.saw_ieof = line.split(';').nth(1).map(|ext| ext.trim().eq_ignore_ascii_case("ieof")).unwrap_or(false);

                    self.current_chunk_size = usize::from_str_radix(size_str, 16)
                        .map_err(|e| ChunkedDecodeError::InvalidChunkSize(e.to_string()))?;

                    if self.current_chunk_size > MAX_CHUNK_SIZE {
                        return Err(ChunkedDecodeError::ChunkSizeTooLarge(self.current_chunk_size));
                    }

                    pos += crlf_pos + 2;
                    consumed = pos;

                    if self.current_chunk_size == 0 {
                        self.state = State::ReadingTrailers;
                    } else {
                        self.state = State::ReadingChunk;
                        self.current_chunk_read = 0;
                    }
                }

                State::ReadingChunk => {
                    let remaining_in_chunk = self.current_chunk_size - self.current_chunk_read;
                    let available = input.len() - pos;
                    let to_read = remaining_in_chunk.min(available);

                    output.extend_from_slice(&input[pos..pos + to_read]);
                    pos += to_read;
                    self.current_chunk_read += to_read;
                    consumed = pos;

                    if self.current_chunk_read == self.current_chunk_size {
                        if pos + 1 < input.len() && &input[pos..pos + 2] == b"\r\n" {
                            pos += 2;
                            consumed = pos;
                            self.state = State::ReadingSize;
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }

                State::ReadingTrailers => {
                    let Some(end_pos) = find_double_crlf(&input[pos..]) else {
                        break;
                    };
                    pos += end_pos + 4;
                    consumed = pos;
                    self.state = State::Complete;
                    break;
                }

                State::Complete => break,
            }
        }

        Ok((output, consumed))
    }

    /// True once the terminating chunk and trailers have been consumed.
    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// True if the body ended via an `ieof` extension on its terminal chunk.
    pub fn saw_ieof(&self) -> bool {
        self.saw_ieof
    }
}

/// Encode `data` as a single chunked-transfer body, terminated normally
/// (`0\r\n\r\n`) or early (`0; ieof\r\n\r\n`) per `ieof`.
pub fn encode_chunk(data: &[u8], ieof: bool) -> Bytes {
    let mut out = Vec::with_capacity(data.len() + 32);
    if !data.is_empty() {
        out.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
    }
    if ieof {
        out.extend_from_slice(b"0; ieof\r\n\r\n");
    } else {
        out.extend_from_slice(b"0\r\n\r\n");
    }
    Bytes::from(out)
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    memchr::memmem::find(data, b"\r\n")
}

fn find_double_crlf(data: &[u8]) -> Option<usize> {
    memchr::memmem::find(data, b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_two_chunks_with_normal_terminator() {
        let chunked = b"17\r\nThis is the first chunk\r\n11\r\nSecond chunk here\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let (decoded, consumed) = decoder.decode(chunked).unwrap();
        assert_eq!(decoded, b"This is the first chunkSecond chunk here");
        assert_eq!(consumed, chunked.len());
        assert!(decoder.is_complete());
        assert!(!decoder.saw_ieof());
    }

    #[test]
    fn decodes_empty_body() {
        let chunked = b"0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let (decoded, consumed) = decoder.decode(chunked).unwrap();
        assert_eq!(decoded, b"");
        assert_eq!(consumed, chunked.len());
        assert!(decoder.is_complete());
    }

    #[test]
    fn recognises_ieof_extension_on_terminal_chunk() {
        let chunked = b"5\r\nhello\r\n0; ieof\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let (decoded, _) = decoder.decode(chunked).unwrap();
        assert_eq!(decoded, b"hello");
        assert!(decoder.is_complete());
        assert!(decoder.saw_ieof());
    }

    #[test]
    fn decodes_incrementally_across_reads() {
        let chunked = b"17\r\nThis is the first chunk\r\n11\r\nSecond chunk here\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let (decoded1, consumed1) = decoder.decode(&chunked[..20]).unwrap();
        assert_eq!(decoded1, b"This is the firs");
        assert_eq!(consumed1, 20);
        assert!(!decoder.is_complete());

        let (decoded2, consumed2) = decoder.decode(&chunked[20..]).unwrap();
        assert_eq!(decoded2, b"t chunkSecond chunk here");
        assert_eq!(consumed2, chunked.len() - 20);
        assert!(decoder.is_complete());
    }

    #[test]
    fn rejects_invalid_chunk_size() {
        let invalid = b"zzzz\r\nchunk data\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let result = decoder.decode(invalid);
        assert!(matches!(result, Err(ChunkedDecodeError::InvalidChunkSize(_))));
    }

    #[test]
    fn encode_chunk_with_ieof_terminator() {
        let encoded = encode_chunk(b"hello", true);
        assert_eq!(encoded.as_ref(), b"5\r\nhello\r\n0; ieof\r\n\r\n");
    }

    #[test]
    fn encode_chunk_with_normal_terminator() {
        let encoded = encode_chunk(b"hello", false);
        assert_eq!(encoded.as_ref(), b"5\r\nhello\r\n0\r\n\r\n");
    }

    #[test]
    fn encode_empty_chunk_is_just_the_terminator() {
        let encoded = encode_chunk(b"", true);
        assert_eq!(encoded.as_ref(), b"0; ieof\r\n\r\n");
    }
}
