// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmGetCertificateRequestPayload {
    pub slot_id: u8,
    pub offset: u16,
    pub length: u16,
}

impl SpdmCodec for SpdmGetCertificateRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.slot_id.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.offset.encode(bytes);
        self.length.encode(bytes);
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetCertificateRequestPayload> {
        let slot_id = u8::read(r)?; // param1
        u8::read(r)?; // param2
        let offset = u16::read(r)?;
        let length = u16::read(r)?;

        Some(SpdmGetCertificateRequestPayload {
            slot_id,
            offset,
            length,
        })
    }
}

/// One chunk of a chain; reassembly is the requester's job.
#[derive(Debug, Clone)]
pub struct SpdmCertificateResponsePayload {
    pub slot_id: u8,
    pub portion_length: u16,
    pub remainder_length: u16,
    pub cert_chain: [u8; config::MAX_SPDM_CERT_PORTION_LEN],
}

impl Default for SpdmCertificateResponsePayload {
    fn default() -> SpdmCertificateResponsePayload {
        SpdmCertificateResponsePayload {
            slot_id: 0,
            portion_length: 0,
            remainder_length: 0,
            cert_chain: [0u8; config::MAX_SPDM_CERT_PORTION_LEN],
        }
    }
}

impl SpdmCodec for SpdmCertificateResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.slot_id.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.portion_length.encode(bytes);
        self.remainder_length.encode(bytes);
        assert!(bytes
            .extend_from_slice(&self.cert_chain[..self.portion_length as usize])
            .is_some());
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmCertificateResponsePayload> {
        let slot_id = u8::read(r)?; // param1
        u8::read(r)?; // param2
        let portion_length = u16::read(r)?;
        if portion_length == 0 || portion_length as usize > config::MAX_SPDM_CERT_PORTION_LEN {
            return None;
        }
        let remainder_length = u16::read(r)?;
        let raw = r.take(portion_length as usize)?;
        let mut cert_chain = [0u8; config::MAX_SPDM_CERT_PORTION_LEN];
        cert_chain[..portion_length as usize].copy_from_slice(raw);

        Some(SpdmCertificateResponsePayload {
            slot_id,
            portion_length,
            remainder_length,
            cert_chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_get_certificate_request_payload() {
        let u8_slice = &mut [0u8; 8];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmGetCertificateRequestPayload {
            slot_id: 2,
            offset: 1024,
            length: 512,
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        let mut reader = Reader::init(u8_slice);
        let request =
            SpdmGetCertificateRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.slot_id, 2);
        assert_eq!(request.offset, 1024);
        assert_eq!(request.length, 512);
    }

    #[test]
    fn test_case0_spdm_certificate_response_payload() {
        let u8_slice = &mut [0u8; 600];
        let mut writer = Writer::init(u8_slice);
        let mut value = SpdmCertificateResponsePayload {
            slot_id: 0,
            portion_length: 128,
            remainder_length: 900,
            ..Default::default()
        };
        value.cert_chain[..128].copy_from_slice(&[0x30; 128]);

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 6 + 128);

        let n = writer.used();
        let mut reader = Reader::init(&u8_slice[..n]);
        let response =
            SpdmCertificateResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(response.portion_length, 128);
        assert_eq!(response.remainder_length, 900);
        assert_eq!(&response.cert_chain[..128], &[0x30; 128][..]);
    }

    #[test]
    fn test_case1_truncated_portion_rejected() {
        let u8_slice = &[0u8, 0, 0x40, 0x00, 0, 0, 1, 2, 3];
        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        let mut reader = Reader::init(u8_slice);
        assert!(SpdmCertificateResponsePayload::spdm_read(&mut context, &mut reader).is_none());
    }
}
