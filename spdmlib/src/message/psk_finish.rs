// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! PSK_FINISH / PSK_FINISH_RSP. The request closes a pre-shared-key
//! handshake with `RequesterVerifyData`, an HMAC under the request
//! finished key over the session transcript hash; no asymmetric
//! signature is involved. Both params of both messages are reserved.

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::message::SpdmMessageGeneralPayload;
use crate::protocol::SpdmDigestStruct;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmPskFinishRequestPayload {
    pub verify_data: SpdmDigestStruct,
}

impl SpdmCodec for SpdmPskFinishRequestPayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
        self.verify_data.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmPskFinishRequestPayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved
        let verify_data = SpdmDigestStruct::spdm_read(context, r)?;

        Some(SpdmPskFinishRequestPayload { verify_data })
    }
}

/// The response is the bare header; its arrival under the handshake keys
/// is the whole answer.
#[derive(Debug, Clone, Default)]
pub struct SpdmPskFinishResponsePayload {}

impl SpdmCodec for SpdmPskFinishResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmPskFinishResponsePayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved

        Some(SpdmPskFinishResponsePayload {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SpdmBaseHashAlgo;
    use crate::testlib::*;

    #[test]
    fn test_case0_psk_finish_request_layout() {
        let u8_slice = &mut [0u8; 64];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmPskFinishRequestPayload {
            verify_data: SpdmDigestStruct::from_data(&[0x5au8; 48]),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;

        value.spdm_encode(&mut context, &mut writer);
        // reserved pair, then a hash-sized verify_data
        let n = writer.used();
        assert_eq!(n, 2 + 48);
        assert_eq!(&u8_slice[..2], &[0, 0]);

        let mut reader = Reader::init(&u8_slice[..n]);
        let psk_finish_request =
            SpdmPskFinishRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(psk_finish_request.verify_data.data_size, 48);
        assert_eq!(psk_finish_request.verify_data.as_ref(), &[0x5au8; 48][..]);
        assert_eq!(0, reader.left());
    }

    #[test]
    fn test_case1_truncated_verify_data_rejected() {
        // one byte short of the negotiated hash size
        let u8_slice = &[0u8; 2 + 47];
        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        let mut reader = Reader::init(u8_slice);
        assert!(SpdmPskFinishRequestPayload::spdm_read(&mut context, &mut reader).is_none());
    }

    #[test]
    fn test_case0_psk_finish_response_layout() {
        let u8_slice = &mut [0u8; 4];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmPskFinishResponsePayload {};

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2);
        let mut reader = Reader::init(&u8_slice[..2]);
        assert!(SpdmPskFinishResponsePayload::spdm_read(&mut context, &mut reader).is_some());
    }
}
