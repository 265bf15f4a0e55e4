// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::message::SpdmMessageGeneralPayload;
use crate::protocol::{
    SpdmRequestCapabilityFlags, SpdmResponseCapabilityFlags, SpdmVersion,
};
use codec::{Codec, Reader, Writer};

/// A 1.0 GET_CAPABILITIES is header-only; 1.1 onward carries the
/// ct_exponent and the flag word.
#[derive(Debug, Clone, Default)]
pub struct SpdmGetCapabilitiesRequestPayload {
    pub ct_exponent: u8,
    pub flags: SpdmRequestCapabilityFlags,
}

impl SpdmCodec for SpdmGetCapabilitiesRequestPayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
        if context.negotiate_info.spdm_version_sel.get_u8() >= SpdmVersion::SpdmVersion11.get_u8()
        {
            0u8.encode(bytes); // reserved
            self.ct_exponent.encode(bytes);
            0u16.encode(bytes); // reserved2
            self.flags.encode(bytes);
        }
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetCapabilitiesRequestPayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved
        let mut ct_exponent = 0;
        let mut flags = SpdmRequestCapabilityFlags::default();
        if context.negotiate_info.spdm_version_sel.get_u8() >= SpdmVersion::SpdmVersion11.get_u8()
        {
            u8::read(r)?; // reserved
            ct_exponent = u8::read(r)?;
            u16::read(r)?; // reserved2
            flags = SpdmRequestCapabilityFlags::read(r)?;
        }
        Some(SpdmGetCapabilitiesRequestPayload { ct_exponent, flags })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmCapabilitiesResponsePayload {
    pub ct_exponent: u8,
    pub flags: SpdmResponseCapabilityFlags,
}

impl SpdmCodec for SpdmCapabilitiesResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
        0u8.encode(bytes); // reserved
        self.ct_exponent.encode(bytes);
        0u16.encode(bytes); // reserved2
        self.flags.encode(bytes);
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmCapabilitiesResponsePayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved
        u8::read(r)?; // reserved
        let ct_exponent = u8::read(r)?;
        u16::read(r)?; // reserved2
        let flags = SpdmResponseCapabilityFlags::read(r)?;
        Some(SpdmCapabilitiesResponsePayload { ct_exponent, flags })
    }
}
