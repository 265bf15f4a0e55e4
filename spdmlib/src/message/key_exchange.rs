// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::opaque::SpdmOpaqueStruct;
use crate::common::spdm_codec::SpdmCodec;
use crate::message::SpdmMeasurementSummaryHashType;
use crate::protocol::{
    SpdmDheExchangeStruct, SpdmDigestStruct, SpdmRandomStruct, SpdmSignatureStruct,
};
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmKeyExchangeRequestPayload {
    pub measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    pub slot_id: u8,
    pub req_session_id: u16,
    pub random: SpdmRandomStruct,
    pub exchange: SpdmDheExchangeStruct,
    pub opaque: SpdmOpaqueStruct,
}

impl SpdmCodec for SpdmKeyExchangeRequestPayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.measurement_summary_hash_type.encode(bytes); // param1
        self.slot_id.encode(bytes); // param2
        self.req_session_id.encode(bytes);
        0u16.encode(bytes); // reserved
        self.random.encode(bytes);
        self.exchange.spdm_encode(context, bytes);
        self.opaque.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmKeyExchangeRequestPayload> {
        let measurement_summary_hash_type = SpdmMeasurementSummaryHashType::read(r)?; // param1
        let slot_id = u8::read(r)?; // param2
        let req_session_id = u16::read(r)?;
        u16::read(r)?; // reserved
        let random = SpdmRandomStruct::read(r)?;
        let exchange = SpdmDheExchangeStruct::spdm_read(context, r)?;
        let opaque = SpdmOpaqueStruct::spdm_read(context, r)?;

        Some(SpdmKeyExchangeRequestPayload {
            measurement_summary_hash_type,
            slot_id,
            req_session_id,
            random,
            exchange,
            opaque,
        })
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmKeyExchangeMutAuthAttributes: u8 {
        const MUT_AUTH_REQ = 0b0000_0001;
        const MUT_AUTH_REQ_WITH_ENCAP_REQUEST = 0b0000_0010;
        const MUT_AUTH_REQ_WITH_GET_DIGESTS = 0b0000_0100;
    }
}

impl Codec for SpdmKeyExchangeMutAuthAttributes {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmKeyExchangeMutAuthAttributes> {
        let bits = u8::read(r)?;
        SpdmKeyExchangeMutAuthAttributes::from_bits(bits)
    }
}

/// Signature and verify_data trail the payload so the transcript can fold
/// everything before them first.
#[derive(Debug, Clone, Default)]
pub struct SpdmKeyExchangeResponsePayload {
    pub heartbeat_period: u8,
    pub rsp_session_id: u16,
    pub mut_auth_req: SpdmKeyExchangeMutAuthAttributes,
    pub req_slot_id: u8,
    pub random: SpdmRandomStruct,
    pub exchange: SpdmDheExchangeStruct,
    pub measurement_summary_hash: SpdmDigestStruct,
    pub opaque: SpdmOpaqueStruct,
    pub signature: SpdmSignatureStruct,
    pub verify_data: SpdmDigestStruct,
}

impl SpdmCodec for SpdmKeyExchangeResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.heartbeat_period.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.rsp_session_id.encode(bytes);
        self.mut_auth_req.encode(bytes);
        self.req_slot_id.encode(bytes);
        self.random.encode(bytes);
        self.exchange.spdm_encode(context, bytes);
        if context.runtime_info.need_measurement_summary_hash {
            self.measurement_summary_hash.spdm_encode(context, bytes);
        }
        self.opaque.spdm_encode(context, bytes);
        self.signature.spdm_encode(context, bytes);
        self.verify_data.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmKeyExchangeResponsePayload> {
        let heartbeat_period = u8::read(r)?; // param1
        u8::read(r)?; // param2
        let rsp_session_id = u16::read(r)?;
        let mut_auth_req = SpdmKeyExchangeMutAuthAttributes::read(r)?;
        let req_slot_id = u8::read(r)?;
        let random = SpdmRandomStruct::read(r)?;
        let exchange = SpdmDheExchangeStruct::spdm_read(context, r)?;
        let measurement_summary_hash = if context.runtime_info.need_measurement_summary_hash {
            SpdmDigestStruct::spdm_read(context, r)?
        } else {
            SpdmDigestStruct::default()
        };
        let opaque = SpdmOpaqueStruct::spdm_read(context, r)?;
        let signature = SpdmSignatureStruct::spdm_read(context, r)?;
        let verify_data = SpdmDigestStruct::spdm_read(context, r)?;

        Some(SpdmKeyExchangeResponsePayload {
            heartbeat_period,
            rsp_session_id,
            mut_auth_req,
            req_slot_id,
            random,
            exchange,
            measurement_summary_hash,
            opaque,
            signature,
            verify_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_key_exchange_request_payload() {
        let u8_slice = &mut [0u8; 256];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmKeyExchangeRequestPayload {
            measurement_summary_hash_type:
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
            slot_id: 0,
            req_session_id: 0xFFFE,
            random: SpdmRandomStruct {
                data: [0x12; SPDM_RANDOM_SIZE],
            },
            exchange: SpdmDheExchangeStruct::from_data(&[0x34; 96]),
            opaque: SpdmOpaqueStruct::default(),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.dhe_sel = SpdmDheAlgo::SECP_384_R1;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 2 + 2 + 32 + 96 + 2);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let request =
            SpdmKeyExchangeRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.req_session_id, 0xFFFE);
        assert_eq!(request.exchange.as_ref(), &[0x34; 96][..]);
    }

    #[test]
    fn test_case0_spdm_key_exchange_response_payload() {
        let u8_slice = &mut [0u8; 512];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmKeyExchangeResponsePayload {
            heartbeat_period: 5,
            rsp_session_id: 0xFFFD,
            mut_auth_req: SpdmKeyExchangeMutAuthAttributes::empty(),
            req_slot_id: 0,
            random: SpdmRandomStruct {
                data: [0x56; SPDM_RANDOM_SIZE],
            },
            exchange: SpdmDheExchangeStruct::from_data(&[0x78; 96]),
            measurement_summary_hash: SpdmDigestStruct::default(),
            opaque: SpdmOpaqueStruct::default(),
            signature: SpdmSignatureStruct {
                data_size: 96,
                data: [0x9a; SPDM_MAX_ASYM_KEY_SIZE],
            },
            verify_data: SpdmDigestStruct::from_data(&[0xbc; 48]),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        context.negotiate_info.base_asym_sel = SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384;
        context.negotiate_info.dhe_sel = SpdmDheAlgo::SECP_384_R1;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 2 + 1 + 1 + 32 + 96 + 2 + 96 + 48);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let response =
            SpdmKeyExchangeResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(response.heartbeat_period, 5);
        assert_eq!(response.rsp_session_id, 0xFFFD);
        assert_eq!(response.verify_data.as_ref(), &[0xbc; 48][..]);
    }
}
