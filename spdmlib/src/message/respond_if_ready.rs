// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use codec::{Codec, Reader, Writer};

/// `request_code` names the deferred request; `token` must match the
/// RESPONSE_NOT_READY that announced it.
#[derive(Debug, Clone, Default)]
pub struct SpdmRespondIfReadyRequestPayload {
    pub request_code: u8,
    pub token: u8,
}

impl SpdmCodec for SpdmRespondIfReadyRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.request_code.encode(bytes); // param1
        self.token.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmRespondIfReadyRequestPayload> {
        let request_code = u8::read(r)?; // param1
        let token = u8::read(r)?; // param2

        Some(SpdmRespondIfReadyRequestPayload {
            request_code,
            token,
        })
    }
}
