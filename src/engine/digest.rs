/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Single-pass SHA-256 digests threaded explicitly through the read/write
//! loops: two plain hasher values the caller owns and updates by hand,
//! rather than a shared digest stream mutated from multiple call sites.

use sha2::{Digest, Sha256};

/// A running SHA-256 digest over one direction of a single ICAP exchange.
#[derive(Clone, Default)]
pub struct RunningDigest {
    hasher: Sha256,
}

impl RunningDigest {
    /// Start a fresh digest.
    pub fn new() -> Self {
        RunningDigest { hasher: Sha256::new() }
    }

    /// Fold in the next slice of bytes, in order.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finish and render as lowercase hex.
    pub fn finish_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_regardless_of_chunk_boundaries() {
        let mut whole = RunningDigest::new();
        whole.update(b"hello world");

        let mut split = RunningDigest::new();
        split.update(b"hello ");
        split.update(b"world");

        assert_eq!(whole.finish_hex(), split.finish_hex());
    }

    #[test]
    fn known_vector() {
        let mut digest = RunningDigest::new();
        digest.update(b"abc");
        assert_eq!(
            digest.finish_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
