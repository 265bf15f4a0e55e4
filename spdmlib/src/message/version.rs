// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use crate::message::SpdmMessageGeneralPayload;
use crate::protocol::SpdmVersionStruct;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmGetVersionRequestPayload {}

impl SpdmCodec for SpdmGetVersionRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetVersionRequestPayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved

        Some(SpdmGetVersionRequestPayload {})
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmVersionResponsePayload {
    pub version_number_entry_count: u8,
    pub versions: [SpdmVersionStruct; config::MAX_SPDM_VERSION_COUNT],
}

impl SpdmCodec for SpdmVersionResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
        0u8.encode(bytes); // reserved
        self.version_number_entry_count.encode(bytes);
        for version in self
            .versions
            .iter()
            .take(self.version_number_entry_count as usize)
        {
            version.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmVersionResponsePayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved
        u8::read(r)?; // reserved
        let version_number_entry_count = u8::read(r)?;
        if version_number_entry_count == 0
            || version_number_entry_count as usize > config::MAX_SPDM_VERSION_COUNT
        {
            return None;
        }
        let mut versions = [SpdmVersionStruct::default(); config::MAX_SPDM_VERSION_COUNT];
        for version in versions
            .iter_mut()
            .take(version_number_entry_count as usize)
        {
            *version = SpdmVersionStruct::read(r)?;
        }
        Some(SpdmVersionResponsePayload {
            version_number_entry_count,
            versions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SpdmVersion;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_version_response_payload() {
        let u8_slice = &mut [0u8; 16];
        let mut writer = Writer::init(u8_slice);
        let mut value = SpdmVersionResponsePayload {
            version_number_entry_count: 2,
            ..Default::default()
        };
        value.versions[0] = SpdmVersionStruct {
            update: 0,
            version: SpdmVersion::SpdmVersion10,
        };
        value.versions[1] = SpdmVersionStruct {
            update: 0,
            version: SpdmVersion::SpdmVersion11,
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + 2 + 2 * 2);

        let mut reader = Reader::init(u8_slice);
        let version_response =
            SpdmVersionResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(version_response.version_number_entry_count, 2);
        assert_eq!(
            version_response.versions[1].version,
            SpdmVersion::SpdmVersion11
        );
    }

    #[test]
    fn test_case1_zero_entry_count_rejected() {
        let u8_slice = &[0u8, 0, 0, 0];
        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        let mut reader = Reader::init(u8_slice);
        assert!(SpdmVersionResponsePayload::spdm_read(&mut context, &mut reader).is_none());
    }
}
