// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Framing for the encapsulated-request flow. The embedded SPDM message
//! following these payloads is carried as raw bytes and fed back through
//! the regular dispatch paths.

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::message::SpdmMessageGeneralPayload;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmGetEncapsulatedRequestPayload {}

impl SpdmCodec for SpdmGetEncapsulatedRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetEncapsulatedRequestPayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved

        Some(SpdmGetEncapsulatedRequestPayload {})
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmEncapsulatedRequestPayload {
    pub request_id: u8,
}

impl SpdmCodec for SpdmEncapsulatedRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.request_id.encode(bytes); // param1
        0u8.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmEncapsulatedRequestPayload> {
        let request_id = u8::read(r)?; // param1
        u8::read(r)?; // param2

        Some(SpdmEncapsulatedRequestPayload { request_id })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmDeliverEncapsulatedResponsePayload {
    pub request_id: u8,
}

impl SpdmCodec for SpdmDeliverEncapsulatedResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.request_id.encode(bytes); // param1
        0u8.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmDeliverEncapsulatedResponsePayload> {
        let request_id = u8::read(r)?; // param1
        u8::read(r)?; // param2

        Some(SpdmDeliverEncapsulatedResponsePayload { request_id })
    }
}

enum_builder! {
    @U8
    EnumName: SpdmEncapsulatedResponseAckPayloadType;
    EnumVal{
        SpdmEncapsulatedResponseAckAbsent => 0x0,
        SpdmEncapsulatedResponseAckPresent => 0x1,
        SpdmEncapsulatedResponseAckReqSlotNumber => 0x2
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmEncapsulatedResponseAckPayload {
    pub request_id: u8,
    pub payload_type: SpdmEncapsulatedResponseAckPayloadType,
}

impl SpdmCodec for SpdmEncapsulatedResponseAckPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.request_id.encode(bytes); // param1
        self.payload_type.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmEncapsulatedResponseAckPayload> {
        let request_id = u8::read(r)?; // param1
        let payload_type = SpdmEncapsulatedResponseAckPayloadType::read(r)?; // param2

        Some(SpdmEncapsulatedResponseAckPayload {
            request_id,
            payload_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_encapsulated_response_ack_round_trip() {
        let u8_slice = &mut [0u8; 2];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmEncapsulatedResponseAckPayload {
            request_id: 7,
            payload_type:
                SpdmEncapsulatedResponseAckPayloadType::SpdmEncapsulatedResponseAckPresent,
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        let mut reader = Reader::init(u8_slice);
        let ack =
            SpdmEncapsulatedResponseAckPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(ack.request_id, 7);
        assert_eq!(
            ack.payload_type,
            SpdmEncapsulatedResponseAckPayloadType::SpdmEncapsulatedResponseAckPresent
        );
    }
}
