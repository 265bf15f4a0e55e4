// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::message::SpdmMessageGeneralPayload;
use crate::protocol::{SpdmDigestStruct, SpdmSignatureStruct};
use codec::{Codec, Reader, Writer};

bitflags! {
    #[derive(Default)]
    pub struct SpdmFinishRequestAttributes: u8 {
        const SIGNATURE_INCLUDED = 0b0000_0001;
    }
}

impl Codec for SpdmFinishRequestAttributes {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmFinishRequestAttributes> {
        let bits = u8::read(r)?;
        SpdmFinishRequestAttributes::from_bits(bits)
    }
}

/// The mutual-auth signature (attribute bit set) uses the requester's
/// asymmetric algorithm, so its size follows `req_asym_sel`.
#[derive(Debug, Clone, Default)]
pub struct SpdmFinishRequestPayload {
    pub finish_request_attributes: SpdmFinishRequestAttributes,
    pub req_slot_id: u8,
    pub signature: SpdmSignatureStruct,
    pub verify_data: SpdmDigestStruct,
}

impl SpdmCodec for SpdmFinishRequestPayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.finish_request_attributes.encode(bytes); // param1
        self.req_slot_id.encode(bytes); // param2
        if self
            .finish_request_attributes
            .contains(SpdmFinishRequestAttributes::SIGNATURE_INCLUDED)
        {
            let size = context.negotiate_info.req_asym_sel.get_size() as usize;
            assert!(bytes.extend_from_slice(&self.signature.data[..size]).is_some());
        }
        self.verify_data.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmFinishRequestPayload> {
        let finish_request_attributes = SpdmFinishRequestAttributes::read(r)?; // param1
        let req_slot_id = u8::read(r)?; // param2
        let signature = if finish_request_attributes
            .contains(SpdmFinishRequestAttributes::SIGNATURE_INCLUDED)
        {
            let size = context.negotiate_info.req_asym_sel.get_size() as usize;
            let raw = r.take(size)?;
            let mut signature = SpdmSignatureStruct {
                data_size: size as u16,
                ..Default::default()
            };
            signature.data[..size].copy_from_slice(raw);
            signature
        } else {
            SpdmSignatureStruct::default()
        };
        let verify_data = SpdmDigestStruct::spdm_read(context, r)?;

        Some(SpdmFinishRequestPayload {
            finish_request_attributes,
            req_slot_id,
            signature,
            verify_data,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmFinishResponsePayload {}

impl SpdmCodec for SpdmFinishResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmFinishResponsePayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved

        Some(SpdmFinishResponsePayload {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_finish_request_payload() {
        let u8_slice = &mut [0u8; 256];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmFinishRequestPayload {
            finish_request_attributes: SpdmFinishRequestAttributes::empty(),
            req_slot_id: 0,
            signature: SpdmSignatureStruct::default(),
            verify_data: SpdmDigestStruct::from_data(&[0xcc; 48]),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 48);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let request = SpdmFinishRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.verify_data.as_ref(), &[0xcc; 48][..]);
    }

    #[test]
    fn test_case1_spdm_finish_request_with_mut_auth_signature() {
        let u8_slice = &mut [0u8; 256];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmFinishRequestPayload {
            finish_request_attributes: SpdmFinishRequestAttributes::SIGNATURE_INCLUDED,
            req_slot_id: 1,
            signature: SpdmSignatureStruct {
                data_size: 96,
                data: [0xdd; SPDM_MAX_ASYM_KEY_SIZE],
            },
            verify_data: SpdmDigestStruct::from_data(&[0xcc; 48]),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        context.negotiate_info.req_asym_sel = SpdmReqAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 96 + 48);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let request = SpdmFinishRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.req_slot_id, 1);
        assert_eq!(request.signature.data_size, 96);
    }
}
