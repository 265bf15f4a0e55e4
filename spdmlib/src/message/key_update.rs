// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! KEY_UPDATE / KEY_UPDATE_ACK. Both directions of the pair carry the
//! same two bytes: param1 picks the rotation mode, param2 is a caller
//! tag the ack must echo, which is how a requester ties an ack to the
//! rotation it started.

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmKeyUpdateOperation;
    EnumVal{
        SpdmUpdateKey => 0x1,
        SpdmUpdateAllKeys => 0x2,
        SpdmVerifyNewKey => 0x3
    }
}

fn write_key_update_params(
    key_update_operation: SpdmKeyUpdateOperation,
    tag: u8,
    bytes: &mut Writer,
) {
    key_update_operation.encode(bytes); // param1: rotation mode
    tag.encode(bytes); // param2: echo tag
}

fn read_key_update_params(r: &mut Reader) -> Option<(SpdmKeyUpdateOperation, u8)> {
    let operation = SpdmKeyUpdateOperation::read(r)?; // param1: rotation mode
    let echo_tag = u8::read(r)?; // param2: echo tag
    Some((operation, echo_tag))
}

/// `SpdmUpdateKey` rotates the sender's outbound traffic secret,
/// `SpdmUpdateAllKeys` rotates both directions, `SpdmVerifyNewKey`
/// probes that the peer switched without rotating anything.
#[derive(Debug, Clone, Default)]
pub struct SpdmKeyUpdateRequestPayload {
    pub key_update_operation: SpdmKeyUpdateOperation,
    pub tag: u8,
}

impl SpdmCodec for SpdmKeyUpdateRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        write_key_update_params(self.key_update_operation, self.tag, bytes);
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmKeyUpdateRequestPayload> {
        let (key_update_operation, tag) = read_key_update_params(r)?;
        Some(SpdmKeyUpdateRequestPayload {
            key_update_operation,
            tag,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmKeyUpdateResponsePayload {
    pub key_update_operation: SpdmKeyUpdateOperation,
    pub tag: u8,
}

impl SpdmCodec for SpdmKeyUpdateResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        write_key_update_params(self.key_update_operation, self.tag, bytes);
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmKeyUpdateResponsePayload> {
        let (key_update_operation, tag) = read_key_update_params(r)?;
        Some(SpdmKeyUpdateResponsePayload {
            key_update_operation,
            tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_key_update_request_layout() {
        let u8_slice = &mut [0u8; 2];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmKeyUpdateRequestPayload {
            key_update_operation: SpdmKeyUpdateOperation::SpdmUpdateAllKeys,
            tag: 0x42,
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        // mode byte then tag byte
        assert_eq!(u8_slice, &[0x2, 0x42]);

        let mut reader = Reader::init(u8_slice);
        let request =
            SpdmKeyUpdateRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(
            request.key_update_operation,
            SpdmKeyUpdateOperation::SpdmUpdateAllKeys
        );
        assert_eq!(request.tag, 0x42);
        assert_eq!(0, reader.left());
    }

    #[test]
    fn test_case0_key_update_ack_echoes_request() {
        let u8_slice = &mut [0u8; 2];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmKeyUpdateResponsePayload {
            key_update_operation: SpdmKeyUpdateOperation::SpdmVerifyNewKey,
            tag: 0xa5,
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        let mut reader = Reader::init(u8_slice);
        let ack = SpdmKeyUpdateResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(
            ack.key_update_operation,
            SpdmKeyUpdateOperation::SpdmVerifyNewKey
        );
        assert_eq!(ack.tag, 0xa5);
    }

    #[test]
    fn test_case1_unknown_mode_survives_round_trip() {
        // forward compatibility: the codec carries modes it does not
        // know; rejecting them is the handler's call
        let u8_slice = &[0x7fu8, 0x01];
        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        let mut reader = Reader::init(u8_slice);
        let request =
            SpdmKeyUpdateRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(
            request.key_update_operation,
            SpdmKeyUpdateOperation::Unknown(0x7f)
        );
    }
}
