// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_capability(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm get_capabilities\n");
        if self.common.runtime_info.get_connection_state()
            != SpdmConnectionState::SpdmConnectionAfterVersion
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnexpectedRequest, 0);
        }

        let mut reader = Reader::init(bytes);
        let header = SpdmMessageHeader::read(&mut reader)
            .ok_or_else(|| spdm_err!(InvalidMessageField))?;

        // the requester names the negotiated version in the header; it
        // must be one this side offered
        if !self
            .common
            .config_info
            .spdm_version
            .iter()
            .any(|version| *version == header.version)
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorMajorVersionMismatch, 0);
        }
        self.common.negotiate_info.spdm_version_sel = header.version;

        let get_capabilities =
            match SpdmGetCapabilitiesRequestPayload::spdm_read(&mut self.common, &mut reader) {
                Some(get_capabilities) => get_capabilities,
                None => {
                    return self.send_spdm_error(
                        None,
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
        debug!("!!! get_capabilities : {:02x?}\n", get_capabilities);

        self.common.negotiate_info.req_ct_exponent_sel = get_capabilities.ct_exponent;
        self.common.negotiate_info.req_capabilities_sel = get_capabilities.flags;
        self.common.negotiate_info.rsp_ct_exponent_sel = self.common.config_info.rsp_ct_exponent;
        self.common.negotiate_info.rsp_capabilities_sel = self.common.config_info.rsp_capabilities;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseCapabilities,
            },
            payload: SpdmMessagePayload::SpdmCapabilitiesResponse(
                SpdmCapabilitiesResponsePayload {
                    ct_exponent: self.common.config_info.rsp_ct_exponent,
                    flags: self.common.config_info.rsp_capabilities,
                },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        self.common.append_message_a(bytes)?;
        self.common.append_message_a(&send_buffer[..used])?;
        self.common
            .runtime_info
            .set_connection_state(SpdmConnectionState::SpdmConnectionAfterCapabilities);

        self.send_message(&send_buffer[..used])
    }
}

#[cfg(test)]
mod tests_responder {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_handle_spdm_capability() {
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
        shared_buffer.drain(&mut response);

        responder
            .handle_spdm_capability(&[0x11, 0xE1, 0, 0, 0, 0, 0, 0, 0xC6, 0x76, 0, 0])
            .unwrap();
        let used = shared_buffer.drain(&mut response);
        assert_eq!(used, 1 + 12);
        assert_eq!(&response[1..3], &[0x11, 0x61]);
        assert_eq!(
            responder.common.negotiate_info.spdm_version_sel,
            SpdmVersion::SpdmVersion11
        );
        assert!(responder
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::KEY_EX_CAP));
        assert_eq!(
            responder.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAfterCapabilities
        );
    }

    #[test]
    fn test_case1_capability_out_of_order() {
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

        // no GET_VERSION first
        responder
            .handle_spdm_capability(&[0x11, 0xE1, 0, 0, 0, 0, 0, 0, 0xC6, 0x76, 0, 0])
            .unwrap();
        let mut response = [0u8; 256];
        shared_buffer.drain(&mut response);
        assert_eq!(response[2], 0x7F);
        assert_eq!(response[3], 0x04); // UnexpectedRequest
    }
}
