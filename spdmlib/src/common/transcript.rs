// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Append-only transcript buffers. Messages are folded in as raw bytes and
//! hashed on demand, so a verification over a partial message (signature
//! fields excluded) is a hash at a marker, and a failed verification rolls
//! the buffer back to that marker.

use crate::config;

/// A point in a transcript buffer, produced by `append_message` before the
/// bytes land. `rollback` restores the buffer to this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptMarker(usize);

macro_rules! managed_buffer {
    ($name:ident, $size:expr) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            data_size: usize,
            buffer: [u8; $size],
        }

        impl $name {
            /// Fold `bytes` in; `None` when the buffer would overflow. The
            /// returned marker addresses the state before this append.
            pub fn append_message(&mut self, bytes: &[u8]) -> Option<TranscriptMarker> {
                if self.data_size + bytes.len() > $size {
                    return None;
                }
                let marker = TranscriptMarker(self.data_size);
                self.buffer[self.data_size..self.data_size + bytes.len()].copy_from_slice(bytes);
                self.data_size += bytes.len();
                Some(marker)
            }

            pub fn marker(&self) -> TranscriptMarker {
                TranscriptMarker(self.data_size)
            }

            pub fn rollback(&mut self, marker: TranscriptMarker) {
                if marker.0 <= self.data_size {
                    self.data_size = marker.0;
                }
            }

            pub fn reset_message(&mut self) {
                self.data_size = 0;
            }

            pub fn data_size(&self) -> usize {
                self.data_size
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.buffer[..self.data_size]
            }
        }

        impl Default for $name {
            fn default() -> $name {
                $name {
                    data_size: 0,
                    buffer: [0u8; $size],
                }
            }
        }
    };
}

managed_buffer!(ManagedBufferA, config::MAX_MANAGED_BUFFER_A_SIZE);
managed_buffer!(ManagedBufferB, config::MAX_MANAGED_BUFFER_B_SIZE);
managed_buffer!(ManagedBufferC, config::MAX_MANAGED_BUFFER_C_SIZE);
managed_buffer!(ManagedBufferM, config::MAX_MANAGED_BUFFER_M_SIZE);
managed_buffer!(ManagedBufferK, config::MAX_MANAGED_BUFFER_K_SIZE);
managed_buffer!(ManagedBufferF, config::MAX_MANAGED_BUFFER_F_SIZE);
managed_buffer!(ManagedBufferTH, config::MAX_MANAGED_BUFFER_TH_SIZE);
managed_buffer!(ManagedBufferM1M2, config::MAX_MANAGED_BUFFER_M1M2_SIZE);
managed_buffer!(ManagedBufferL1L2, config::MAX_MANAGED_BUFFER_L1L2_SIZE);
