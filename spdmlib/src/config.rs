// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Compile-time sizing for buffers and tables. Values bound the largest
//! message the engine will build or accept; the transport may deliver less.

/// Largest single SPDM message, plain or decrypted.
pub const MAX_SPDM_MESSAGE_BUFFER_SIZE: usize = 1280;

/// Largest framed message handed to the device: message plus transport
/// header plus secured-record overhead.
pub const MAX_SPDM_TRANSPORT_SIZE: usize = 1344;

pub const MAX_SPDM_CERT_CHAIN_DATA_SIZE: usize = 4096;

/// Certificate chains travel in chunks of at most this many bytes.
pub const MAX_SPDM_CERT_PORTION_LEN: usize = 512;

pub const MAX_SPDM_MEASUREMENT_BLOCK_COUNT: usize = 8;
pub const MAX_SPDM_MEASUREMENT_VALUE_LEN: usize = 64;
pub const MAX_SPDM_MEASUREMENT_RECORD_SIZE: usize = 640;

pub const MAX_SPDM_OPAQUE_SIZE: usize = 64;

pub const MAX_SPDM_VENDOR_DEFINED_VENDOR_ID_LEN: usize = 16;
pub const MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE: usize = 256;

pub const MAX_SPDM_PSK_SIZE: usize = 64;
pub const MAX_SPDM_PSK_HINT_SIZE: usize = 32;
pub const MAX_SPDM_PSK_CONTEXT_SIZE: usize = 64;

pub const MAX_SPDM_SESSION_COUNT: usize = 4;
pub const MAX_SPDM_VERSION_COUNT: usize = 5;
pub const SPDM_MAX_SLOT_NUMBER: usize = 8;

/// Bound on encapsulated request round-trips in one polling pass.
pub const MAX_ENCAP_ROUNDS: usize = 32;

// Transcript buffer capacities. A holds the negotiation messages, B the
// digest/certificate phase (a full chunked chain), C the challenge phase,
// M measurement exchanges, K/F the per-session handshake messages. TH and
// M1M2 are assembled from the others and sized for the worst case sum.
pub const MAX_MANAGED_BUFFER_A_SIZE: usize = 768;
pub const MAX_MANAGED_BUFFER_B_SIZE: usize = 6144;
pub const MAX_MANAGED_BUFFER_C_SIZE: usize = 1536;
pub const MAX_MANAGED_BUFFER_M_SIZE: usize = 3072;
pub const MAX_MANAGED_BUFFER_K_SIZE: usize = 2048;
pub const MAX_MANAGED_BUFFER_F_SIZE: usize = 768;
pub const MAX_MANAGED_BUFFER_TH_SIZE: usize = 8192;
pub const MAX_MANAGED_BUFFER_M1M2_SIZE: usize = 8704;
pub const MAX_MANAGED_BUFFER_L1L2_SIZE: usize = 4096;

/// Receive timeout for ordinary request/response rounds, in microseconds.
pub const ST1: usize = 1_000_000;
