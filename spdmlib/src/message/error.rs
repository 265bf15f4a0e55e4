// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmErrorCode;
    EnumVal{
        SpdmErrorInvalidRequest => 0x1,
        SpdmErrorBusy => 0x3,
        SpdmErrorUnexpectedRequest => 0x4,
        SpdmErrorUnspecified => 0x5,
        SpdmErrorDecryptError => 0x6,
        SpdmErrorUnsupportedRequest => 0x7,
        SpdmErrorRequestInFlight => 0x8,
        SpdmErrorInvalidResponseCode => 0x9,
        SpdmErrorSessionLimitExceeded => 0xA,
        SpdmErrorMajorVersionMismatch => 0x41,
        SpdmErrorResponseNotReady => 0x42,
        SpdmErrorRequestResynch => 0x43,
        SpdmErrorVendorDefined => 0xFF
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpdmErrorResponseNoneExtData {}

impl Codec for SpdmErrorResponseNoneExtData {
    fn encode(&self, _bytes: &mut Writer) {}

    fn read(_r: &mut Reader) -> Option<SpdmErrorResponseNoneExtData> {
        Some(SpdmErrorResponseNoneExtData {})
    }
}

/// Extended payload of ERROR(RESPONSE_NOT_READY). The requester waits
/// `rdtm << rdt_exponent` microseconds, then replays with the token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpdmErrorResponseNotReadyExtData {
    pub rdt_exponent: u8,
    pub request_code: u8,
    pub token: u8,
    pub rdtm: u8,
}

impl Codec for SpdmErrorResponseNotReadyExtData {
    fn encode(&self, bytes: &mut Writer) {
        self.rdt_exponent.encode(bytes);
        self.request_code.encode(bytes);
        self.token.encode(bytes);
        self.rdtm.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmErrorResponseNotReadyExtData> {
        let rdt_exponent = u8::read(r)?;
        let request_code = u8::read(r)?;
        let token = u8::read(r)?;
        let rdtm = u8::read(r)?;

        Some(SpdmErrorResponseNotReadyExtData {
            rdt_exponent,
            request_code,
            token,
            rdtm,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmErrorResponseExtData {
    SpdmErrorExtDataNone(SpdmErrorResponseNoneExtData),
    SpdmErrorExtDataNotReady(SpdmErrorResponseNotReadyExtData),
}

impl Default for SpdmErrorResponseExtData {
    fn default() -> SpdmErrorResponseExtData {
        SpdmErrorResponseExtData::SpdmErrorExtDataNone(SpdmErrorResponseNoneExtData {})
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmErrorResponsePayload {
    pub error_code: SpdmErrorCode,
    pub error_data: u8,
    pub extended_data: SpdmErrorResponseExtData,
}

impl SpdmCodec for SpdmErrorResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.error_code.encode(bytes); // param1
        self.error_data.encode(bytes); // param2
        match &self.extended_data {
            SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(ext_data) => {
                ext_data.encode(bytes);
            }
            SpdmErrorResponseExtData::SpdmErrorExtDataNone(ext_data) => {
                ext_data.encode(bytes);
            }
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmErrorResponsePayload> {
        let error_code = SpdmErrorCode::read(r)?; // param1
        let error_data = u8::read(r)?; // param2

        let extended_data = match error_code {
            SpdmErrorCode::SpdmErrorResponseNotReady => {
                SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(
                    SpdmErrorResponseNotReadyExtData::read(r)?,
                )
            }
            _ => SpdmErrorResponseExtData::SpdmErrorExtDataNone(
                SpdmErrorResponseNoneExtData::read(r)?,
            ),
        };

        Some(SpdmErrorResponsePayload {
            error_code,
            error_data,
            extended_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_error_response_payload_not_ready() {
        let u8_slice = &mut [0u8; 8];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmErrorResponsePayload {
            error_code: SpdmErrorCode::SpdmErrorResponseNotReady,
            error_data: 0,
            extended_data: SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(
                SpdmErrorResponseNotReadyExtData {
                    rdt_exponent: 1,
                    request_code: 0x81,
                    token: 42,
                    rdtm: 1,
                },
            ),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 6);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let error = SpdmErrorResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(error.error_code, SpdmErrorCode::SpdmErrorResponseNotReady);
        match error.extended_data {
            SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(ext_data) => {
                assert_eq!(ext_data.token, 42);
                assert_eq!(ext_data.request_code, 0x81);
            }
            _ => panic!("wrong extended data"),
        }
    }

    #[test]
    fn test_case1_spdm_error_response_payload_busy() {
        let u8_slice = &mut [0u8; 8];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmErrorResponsePayload {
            error_code: SpdmErrorCode::SpdmErrorBusy,
            error_data: 0,
            extended_data: SpdmErrorResponseExtData::default(),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let error = SpdmErrorResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(error.error_code, SpdmErrorCode::SpdmErrorBusy);
    }
}
