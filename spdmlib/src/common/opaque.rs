// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use codec::{Codec, Reader, Writer};

/// Opaque data carried alongside several messages: `length(2) || bytes`.
/// The engine transports it untouched.
#[derive(Debug, Clone, Copy)]
pub struct SpdmOpaqueStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_OPAQUE_SIZE],
}

impl Default for SpdmOpaqueStruct {
    fn default() -> SpdmOpaqueStruct {
        SpdmOpaqueStruct {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_OPAQUE_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmOpaqueStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmCodec for SpdmOpaqueStruct {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.data_size.encode(bytes);
        assert!(bytes
            .extend_from_slice(&self.data[..self.data_size as usize])
            .is_some());
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmOpaqueStruct> {
        let data_size = u16::read(r)?;
        if data_size as usize > config::MAX_SPDM_OPAQUE_SIZE {
            return None;
        }
        let raw = r.take(data_size as usize)?;
        let mut data = [0u8; config::MAX_SPDM_OPAQUE_SIZE];
        data[..data_size as usize].copy_from_slice(raw);
        Some(SpdmOpaqueStruct { data_size, data })
    }
}
