// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmConnectionState, SpdmResponseState};
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_version(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm get_version\n");
        // GET_VERSION wipes the connection, completing any pending
        // resynchronization as a side effect
        self.common.reset_context();
        self.common
            .runtime_info
            .set_response_state(SpdmResponseState::SpdmResponseStateNormal);

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        if SpdmGetVersionRequestPayload::spdm_read(&mut self.common, &mut reader).is_none() {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }

        let mut version_number_entry_count = 0u8;
        let mut versions = [SpdmVersionStruct::default(); config::MAX_SPDM_VERSION_COUNT];
        for version in self.common.config_info.spdm_version.iter() {
            if let SpdmVersion::Unknown(_) = version {
                continue;
            }
            // each supported version exactly once, in config order
            if versions
                .iter()
                .take(version_number_entry_count as usize)
                .any(|entry| entry.version == *version)
            {
                continue;
            }
            versions[version_number_entry_count as usize] = SpdmVersionStruct {
                update: 0,
                version: *version,
            };
            version_number_entry_count += 1;
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: SpdmVersion::SpdmVersion10,
                request_response_code: SpdmRequestResponseCode::SpdmResponseVersion,
            },
            payload: SpdmMessagePayload::SpdmVersionResponse(SpdmVersionResponsePayload {
                version_number_entry_count,
                versions,
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        self.common.append_message_a(bytes)?;
        self.common.append_message_a(&send_buffer[..used])?;
        self.common
            .runtime_info
            .set_connection_state(SpdmConnectionState::SpdmConnectionAfterVersion);

        self.send_message(&send_buffer[..used])
    }
}

#[cfg(test)]
mod tests_responder {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_handle_spdm_version() {
        let (config_info, provision_info) = create_info();
        let shared_buffer = SharedBuffer::new();
        let mut device_io = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = ResponderContext::new(
            &mut device_io,
            transport_encap,
            config_info,
            provision_info,
        );

        responder.handle_spdm_version(&[0x10, 0x84, 0, 0]).unwrap();
        let mut response = [0u8; 256];
        let used = shared_buffer.drain(&mut response);
        assert!(used > 0);
        // transport byte, then VERSION at 1.0
        assert_eq!(&response[1..3], &[0x10, 0x04]);
        // two entries: 1.0 and 1.1
        assert_eq!(response[6], 2);
        assert_eq!(
            responder.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAfterVersion
        );
        assert!(responder.common.runtime_info.message_a.data_size() > 0);
    }
}
