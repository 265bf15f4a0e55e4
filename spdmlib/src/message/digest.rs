// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use crate::message::SpdmMessageGeneralPayload;
use crate::protocol::SpdmDigestStruct;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmGetDigestsRequestPayload {}

impl SpdmCodec for SpdmGetDigestsRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetDigestsRequestPayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved

        Some(SpdmGetDigestsRequestPayload {})
    }
}

/// Bit i of `slot_mask` marks slot i provisioned; one digest follows per
/// set bit, lowest slot first.
#[derive(Debug, Clone, Default)]
pub struct SpdmDigestsResponsePayload {
    pub slot_mask: u8,
    pub digests: [SpdmDigestStruct; config::SPDM_MAX_SLOT_NUMBER],
}

impl SpdmCodec for SpdmDigestsResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        0u8.encode(bytes); // param1
        self.slot_mask.encode(bytes); // param2
        let count = self.slot_mask.count_ones() as usize;
        for digest in self.digests.iter().take(count) {
            digest.spdm_encode(context, bytes);
        }
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmDigestsResponsePayload> {
        u8::read(r)?; // param1
        let slot_mask = u8::read(r)?; // param2
        let count = slot_mask.count_ones() as usize;
        let mut digests = [SpdmDigestStruct::default(); config::SPDM_MAX_SLOT_NUMBER];
        for digest in digests.iter_mut().take(count) {
            *digest = SpdmDigestStruct::spdm_read(context, r)?;
        }
        Some(SpdmDigestsResponsePayload { slot_mask, digests })
    }
}
