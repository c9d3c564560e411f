/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! On-the-wire ICAP encoding and decoding.

pub mod chunked;
pub mod decode;
pub mod encode;
