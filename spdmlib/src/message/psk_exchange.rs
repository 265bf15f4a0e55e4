// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::opaque::SpdmOpaqueStruct;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use crate::message::SpdmMeasurementSummaryHashType;
use crate::protocol::SpdmDigestStruct;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Copy)]
pub struct SpdmPskContextStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_PSK_CONTEXT_SIZE],
}

impl Default for SpdmPskContextStruct {
    fn default() -> SpdmPskContextStruct {
        SpdmPskContextStruct {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_PSK_CONTEXT_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmPskContextStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmPskContextStruct {
    pub fn from_data(data: &[u8]) -> SpdmPskContextStruct {
        let mut context = SpdmPskContextStruct {
            data_size: data.len() as u16,
            ..Default::default()
        };
        context.data[..data.len()].copy_from_slice(data);
        context
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpdmPskHintWireStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_PSK_HINT_SIZE],
}

impl Default for SpdmPskHintWireStruct {
    fn default() -> SpdmPskHintWireStruct {
        SpdmPskHintWireStruct {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_PSK_HINT_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmPskHintWireStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmPskHintWireStruct {
    pub fn from_data(data: &[u8]) -> SpdmPskHintWireStruct {
        let mut hint = SpdmPskHintWireStruct {
            data_size: data.len() as u16,
            ..Default::default()
        };
        hint.data[..data.len()].copy_from_slice(data);
        hint
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmPskExchangeRequestPayload {
    pub measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    pub req_session_id: u16,
    pub psk_hint: SpdmPskHintWireStruct,
    pub psk_context: SpdmPskContextStruct,
    pub opaque: SpdmOpaqueStruct,
}

impl SpdmCodec for SpdmPskExchangeRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.measurement_summary_hash_type.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.req_session_id.encode(bytes);
        self.psk_hint.data_size.encode(bytes);
        self.psk_context.data_size.encode(bytes);
        self.opaque.data_size.encode(bytes);
        assert!(bytes.extend_from_slice(self.psk_hint.as_ref()).is_some());
        assert!(bytes.extend_from_slice(self.psk_context.as_ref()).is_some());
        assert!(bytes.extend_from_slice(self.opaque.as_ref()).is_some());
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmPskExchangeRequestPayload> {
        let measurement_summary_hash_type = SpdmMeasurementSummaryHashType::read(r)?; // param1
        u8::read(r)?; // param2
        let req_session_id = u16::read(r)?;
        let psk_hint_size = u16::read(r)?;
        let psk_context_size = u16::read(r)?;
        let opaque_size = u16::read(r)?;
        if psk_hint_size as usize > config::MAX_SPDM_PSK_HINT_SIZE
            || psk_context_size as usize > config::MAX_SPDM_PSK_CONTEXT_SIZE
            || opaque_size as usize > config::MAX_SPDM_OPAQUE_SIZE
        {
            return None;
        }
        let psk_hint = SpdmPskHintWireStruct::from_data(r.take(psk_hint_size as usize)?);
        let psk_context = SpdmPskContextStruct::from_data(r.take(psk_context_size as usize)?);
        let mut opaque = SpdmOpaqueStruct {
            data_size: opaque_size,
            ..Default::default()
        };
        opaque.data[..opaque_size as usize].copy_from_slice(r.take(opaque_size as usize)?);

        Some(SpdmPskExchangeRequestPayload {
            measurement_summary_hash_type,
            req_session_id,
            psk_hint,
            psk_context,
            opaque,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmPskExchangeResponsePayload {
    pub heartbeat_period: u8,
    pub rsp_session_id: u16,
    pub measurement_summary_hash: SpdmDigestStruct,
    pub psk_context: SpdmPskContextStruct,
    pub opaque: SpdmOpaqueStruct,
    pub verify_data: SpdmDigestStruct,
}

impl SpdmCodec for SpdmPskExchangeResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.heartbeat_period.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.rsp_session_id.encode(bytes);
        0u16.encode(bytes); // reserved
        self.psk_context.data_size.encode(bytes);
        self.opaque.data_size.encode(bytes);
        if context.runtime_info.need_measurement_summary_hash {
            self.measurement_summary_hash.spdm_encode(context, bytes);
        }
        assert!(bytes.extend_from_slice(self.psk_context.as_ref()).is_some());
        assert!(bytes.extend_from_slice(self.opaque.as_ref()).is_some());
        self.verify_data.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmPskExchangeResponsePayload> {
        let heartbeat_period = u8::read(r)?; // param1
        u8::read(r)?; // param2
        let rsp_session_id = u16::read(r)?;
        u16::read(r)?; // reserved
        let psk_context_size = u16::read(r)?;
        let opaque_size = u16::read(r)?;
        if psk_context_size as usize > config::MAX_SPDM_PSK_CONTEXT_SIZE
            || opaque_size as usize > config::MAX_SPDM_OPAQUE_SIZE
        {
            return None;
        }
        let measurement_summary_hash = if context.runtime_info.need_measurement_summary_hash {
            SpdmDigestStruct::spdm_read(context, r)?
        } else {
            SpdmDigestStruct::default()
        };
        let psk_context = SpdmPskContextStruct::from_data(r.take(psk_context_size as usize)?);
        let mut opaque = SpdmOpaqueStruct {
            data_size: opaque_size,
            ..Default::default()
        };
        opaque.data[..opaque_size as usize].copy_from_slice(r.take(opaque_size as usize)?);
        let verify_data = SpdmDigestStruct::spdm_read(context, r)?;

        Some(SpdmPskExchangeResponsePayload {
            heartbeat_period,
            rsp_session_id,
            measurement_summary_hash,
            psk_context,
            opaque,
            verify_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SpdmBaseHashAlgo;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_psk_exchange_request_payload() {
        let u8_slice = &mut [0u8; 256];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmPskExchangeRequestPayload {
            measurement_summary_hash_type:
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
            req_session_id: 0xFFFE,
            psk_hint: SpdmPskHintWireStruct::from_data(b"TestPskHint"),
            psk_context: SpdmPskContextStruct::from_data(&[0x77; 32]),
            opaque: SpdmOpaqueStruct::default(),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 2 + 6 + 11 + 32);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let request =
            SpdmPskExchangeRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.req_session_id, 0xFFFE);
        assert_eq!(request.psk_hint.as_ref(), b"TestPskHint");
        assert_eq!(request.psk_context.as_ref(), &[0x77; 32][..]);
    }

    #[test]
    fn test_case0_spdm_psk_exchange_response_payload() {
        let u8_slice = &mut [0u8; 256];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmPskExchangeResponsePayload {
            heartbeat_period: 0,
            rsp_session_id: 0xFFFD,
            measurement_summary_hash: SpdmDigestStruct::default(),
            psk_context: SpdmPskContextStruct::from_data(&[0x88; 32]),
            opaque: SpdmOpaqueStruct::default(),
            verify_data: SpdmDigestStruct::from_data(&[0x99; 48]),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 2 + 2 + 4 + 32 + 48);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let response =
            SpdmPskExchangeResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(response.rsp_session_id, 0xFFFD);
        assert_eq!(response.verify_data.as_ref(), &[0x99; 48][..]);
    }
}
