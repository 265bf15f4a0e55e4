// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::spdm_result_err;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_capability(&mut self) -> SpdmResult {
        self.with_retry(|requester| requester.try_send_receive_spdm_capability())
    }

    fn try_send_receive_spdm_capability(&mut self) -> SpdmResult {
        info!("send spdm capability\n");
        if self.common.runtime_info.get_connection_state()
            != SpdmConnectionState::SpdmConnectionAfterVersion
        {
            return spdm_result_err!(InvalidParameter);
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestGetCapabilities,
            },
            payload: SpdmMessagePayload::SpdmGetCapabilitiesRequest(
                SpdmGetCapabilitiesRequestPayload {
                    ct_exponent: self.common.config_info.req_ct_exponent,
                    flags: self.common.config_info.req_capabilities,
                },
            ),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_message(&send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_message(&mut receive_buffer)?;
        self.handle_spdm_capability_response(
            &send_buffer[..send_used],
            &receive_buffer[..receive_used],
        )
    }

    fn handle_spdm_capability_response(
        &mut self,
        send_buffer: &[u8],
        receive_buffer: &[u8],
    ) -> SpdmResult {
        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.version != self.common.negotiate_info.spdm_version_sel {
                    return spdm_result_err!(InvalidMessageField);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseCapabilities => {
                        let capabilities_rsp = SpdmCapabilitiesResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        );
                        let used = reader.used();
                        if let Some(capabilities_rsp) = capabilities_rsp {
                            debug!("!!! capabilities rsp : {:02x?}\n", capabilities_rsp);

                            self.common.negotiate_info.req_ct_exponent_sel =
                                self.common.config_info.req_ct_exponent;
                            self.common.negotiate_info.req_capabilities_sel =
                                self.common.config_info.req_capabilities;
                            self.common.negotiate_info.rsp_ct_exponent_sel =
                                capabilities_rsp.ct_exponent;
                            self.common.negotiate_info.rsp_capabilities_sel =
                                capabilities_rsp.flags;

                            self.common.append_message_a(send_buffer)?;
                            self.common.append_message_a(&receive_buffer[..used])?;
                            self.common.runtime_info.set_connection_state(
                                SpdmConnectionState::SpdmConnectionAfterCapabilities,
                            );
                            Ok(())
                        } else {
                            error!("!!! capabilities : fail !!!\n");
                            spdm_result_err!(InvalidMessageField)
                        }
                    }
                    SpdmRequestResponseCode::SpdmResponseError => {
                        let received = self.spdm_handle_error_response_main(
                            None,
                            receive_buffer,
                            SpdmRequestResponseCode::SpdmRequestGetCapabilities,
                            SpdmRequestResponseCode::SpdmResponseCapabilities,
                        )?;
                        self.handle_spdm_capability_response(send_buffer, received.as_ref())
                    }
                    _ => spdm_result_err!(InvalidMessageField),
                }
            }
            None => spdm_result_err!(InvalidMessageField),
        }
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::responder;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_capability() {
        let (rsp_config_info, rsp_provision_info) = create_info();
        let (req_config_info, req_provision_info) = create_info();

        let shared_buffer = SharedBuffer::new();
        let mut device_io_responder = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = responder::ResponderContext::new(
            &mut device_io_responder,
            transport_encap,
            rsp_config_info,
            rsp_provision_info,
        );

        let transport_encap2 = &mut TestTransportEncap;
        let mut device_io_requester = FakeSpdmDeviceIo::new(&shared_buffer, &mut responder);

        let mut requester = RequesterContext::new(
            &mut device_io_requester,
            transport_encap2,
            req_config_info,
            req_provision_info,
        );

        assert!(requester.send_receive_spdm_version().is_ok());
        assert!(requester.send_receive_spdm_capability().is_ok());
        assert!(requester
            .common
            .negotiate_info
            .rsp_capabilities_sel
            .contains(SpdmResponseCapabilityFlags::CERT_CAP));
        assert_eq!(
            requester.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAfterCapabilities
        );
    }
}
