// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmRequestResponseCode;
    EnumVal{
        SpdmResponseDigests => 0x01,
        SpdmResponseCertificate => 0x02,
        SpdmResponseChallengeAuth => 0x03,
        SpdmResponseVersion => 0x04,
        SpdmResponseMeasurements => 0x60,
        SpdmResponseCapabilities => 0x61,
        SpdmResponseAlgorithms => 0x63,
        SpdmResponseKeyExchangeRsp => 0x64,
        SpdmResponseFinishRsp => 0x65,
        SpdmResponsePskExchangeRsp => 0x66,
        SpdmResponsePskFinishRsp => 0x67,
        SpdmResponseHeartbeatAck => 0x68,
        SpdmResponseKeyUpdateAck => 0x69,
        SpdmResponseEncapsulatedRequest => 0x6A,
        SpdmResponseEncapsulatedResponseAck => 0x6B,
        SpdmResponseEndSessionAck => 0x6C,
        SpdmResponseVendorDefinedResponse => 0x7E,
        SpdmResponseError => 0x7F,
        SpdmRequestGetDigests => 0x81,
        SpdmRequestGetCertificate => 0x82,
        SpdmRequestChallenge => 0x83,
        SpdmRequestGetVersion => 0x84,
        SpdmRequestGetMeasurements => 0xE0,
        SpdmRequestGetCapabilities => 0xE1,
        SpdmRequestNegotiateAlgorithms => 0xE3,
        SpdmRequestKeyExchange => 0xE4,
        SpdmRequestFinish => 0xE5,
        SpdmRequestPskExchange => 0xE6,
        SpdmRequestPskFinish => 0xE7,
        SpdmRequestHeartbeat => 0xE8,
        SpdmRequestKeyUpdate => 0xE9,
        SpdmRequestGetEncapsulatedRequest => 0xEA,
        SpdmRequestDeliverEncapsulatedResponse => 0xEB,
        SpdmRequestEndSession => 0xEC,
        SpdmRequestVendorDefinedRequest => 0xFE,
        SpdmRequestRespondIfReady => 0xFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_opcode_round_trip() {
        let u8_slice = &mut [0u8; 1];
        let mut writer = Writer::init(u8_slice);
        SpdmRequestResponseCode::SpdmRequestKeyExchange.encode(&mut writer);
        assert_eq!(u8_slice[0], 0xE4);

        let mut reader = Reader::init(u8_slice);
        assert_eq!(
            SpdmRequestResponseCode::read(&mut reader).unwrap(),
            SpdmRequestResponseCode::SpdmRequestKeyExchange
        );
    }
}
