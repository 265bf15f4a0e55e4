// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::opaque::SpdmOpaqueStruct;
use crate::common::spdm_codec::SpdmCodec;
use crate::protocol::{SpdmDigestStruct, SpdmNonceStruct, SpdmSignatureStruct};
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmMeasurementSummaryHashType;
    EnumVal{
        SpdmMeasurementSummaryHashTypeNone => 0x0,
        SpdmMeasurementSummaryHashTypeTcb => 0x1,
        SpdmMeasurementSummaryHashTypeAll => 0xFF
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmChallengeRequestPayload {
    pub slot_id: u8,
    pub measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    pub nonce: SpdmNonceStruct,
}

impl SpdmCodec for SpdmChallengeRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.slot_id.encode(bytes); // param1
        self.measurement_summary_hash_type.encode(bytes); // param2
        self.nonce.encode(bytes);
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmChallengeRequestPayload> {
        let slot_id = u8::read(r)?; // param1
        let measurement_summary_hash_type = SpdmMeasurementSummaryHashType::read(r)?; // param2
        let nonce = SpdmNonceStruct::read(r)?;

        Some(SpdmChallengeRequestPayload {
            slot_id,
            measurement_summary_hash_type,
            nonce,
        })
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmChallengeAuthAttribute: u8 {
        const BASIC_MUT_AUTH_REQ = 0b1000_0000;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmChallengeAuthResponsePayload {
    pub slot_id: u8,
    pub slot_mask: u8,
    pub challenge_auth_attribute: SpdmChallengeAuthAttribute,
    pub cert_chain_hash: SpdmDigestStruct,
    pub nonce: SpdmNonceStruct,
    pub measurement_summary_hash: SpdmDigestStruct,
    pub opaque: SpdmOpaqueStruct,
    pub signature: SpdmSignatureStruct,
}

impl SpdmCodec for SpdmChallengeAuthResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        (self.slot_id | self.challenge_auth_attribute.bits()).encode(bytes); // param1
        self.slot_mask.encode(bytes); // param2
        self.cert_chain_hash.spdm_encode(context, bytes);
        self.nonce.encode(bytes);
        if context.runtime_info.need_measurement_summary_hash {
            self.measurement_summary_hash.spdm_encode(context, bytes);
        }
        self.opaque.spdm_encode(context, bytes);
        self.signature.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmChallengeAuthResponsePayload> {
        let param1 = u8::read(r)?;
        let slot_id = param1 & 0xf;
        let challenge_auth_attribute = SpdmChallengeAuthAttribute::from_bits(param1 & 0x80)?;
        let slot_mask = u8::read(r)?; // param2
        let cert_chain_hash = SpdmDigestStruct::spdm_read(context, r)?;
        let nonce = SpdmNonceStruct::read(r)?;
        let measurement_summary_hash = if context.runtime_info.need_measurement_summary_hash {
            SpdmDigestStruct::spdm_read(context, r)?
        } else {
            SpdmDigestStruct::default()
        };
        let opaque = SpdmOpaqueStruct::spdm_read(context, r)?;
        let signature = SpdmSignatureStruct::spdm_read(context, r)?;
        Some(SpdmChallengeAuthResponsePayload {
            slot_id,
            slot_mask,
            challenge_auth_attribute,
            cert_chain_hash,
            nonce,
            measurement_summary_hash,
            opaque,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SPDM_NONCE_SIZE};
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_challenge_request_payload() {
        let u8_slice = &mut [0u8; 40];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmChallengeRequestPayload {
            slot_id: 1,
            measurement_summary_hash_type:
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeAll,
            nonce: SpdmNonceStruct {
                data: [0x5a; SPDM_NONCE_SIZE],
            },
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + SPDM_NONCE_SIZE);

        let mut reader = Reader::init(u8_slice);
        let request = SpdmChallengeRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.slot_id, 1);
        assert_eq!(
            request.measurement_summary_hash_type,
            SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeAll
        );
        assert_eq!(request.nonce.data[10], 0x5a);
    }

    #[test]
    fn test_case0_spdm_challenge_auth_response_payload() {
        let u8_slice = &mut [0u8; 512];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmChallengeAuthResponsePayload {
            slot_id: 0,
            slot_mask: 0x1,
            challenge_auth_attribute: SpdmChallengeAuthAttribute::empty(),
            cert_chain_hash: SpdmDigestStruct::from_data(&[0x11; 48]),
            nonce: SpdmNonceStruct {
                data: [0x22; SPDM_NONCE_SIZE],
            },
            measurement_summary_hash: SpdmDigestStruct::from_data(&[0x33; 48]),
            opaque: SpdmOpaqueStruct::default(),
            signature: SpdmSignatureStruct {
                data_size: 96,
                data: [0x44; crate::protocol::SPDM_MAX_ASYM_KEY_SIZE],
            },
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        context.negotiate_info.base_asym_sel = SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384;
        context.runtime_info.need_measurement_summary_hash = true;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 48 + 32 + 48 + 2 + 96);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let response =
            SpdmChallengeAuthResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(response.slot_mask, 0x1);
        assert_eq!(response.cert_chain_hash.as_ref(), &[0x11; 48][..]);
        assert_eq!(response.measurement_summary_hash.as_ref(), &[0x33; 48][..]);
        assert_eq!(response.signature.data_size, 96);
    }

    #[test]
    fn test_case1_no_summary_hash_when_not_requested() {
        let u8_slice = &mut [0u8; 512];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmChallengeAuthResponsePayload {
            slot_mask: 0x1,
            cert_chain_hash: SpdmDigestStruct::from_data(&[0x11; 48]),
            signature: SpdmSignatureStruct {
                data_size: 96,
                data: [0x44; crate::protocol::SPDM_MAX_ASYM_KEY_SIZE],
            },
            ..Default::default()
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        context.negotiate_info.base_asym_sel = SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384;
        context.runtime_info.need_measurement_summary_hash = false;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 48 + 32 + 2 + 96);
    }
}
