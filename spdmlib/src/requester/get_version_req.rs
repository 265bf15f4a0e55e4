// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::spdm_result_err;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_version(&mut self) -> SpdmResult {
        self.with_retry(|requester| requester.try_send_receive_spdm_version())
    }

    fn try_send_receive_spdm_version(&mut self) -> SpdmResult {
        info!("send spdm version\n");
        // GET_VERSION restarts the connection from scratch
        self.common.reset_context();

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: SpdmVersion::SpdmVersion10,
                request_response_code: SpdmRequestResponseCode::SpdmRequestGetVersion,
            },
            payload: SpdmMessagePayload::SpdmGetVersionRequest(SpdmGetVersionRequestPayload {}),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_message(&send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_message(&mut receive_buffer)?;
        self.handle_spdm_version_response(
            &send_buffer[..send_used],
            &receive_buffer[..receive_used],
        )
    }

    fn handle_spdm_version_response(
        &mut self,
        send_buffer: &[u8],
        receive_buffer: &[u8],
    ) -> SpdmResult {
        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => match message_header.request_response_code {
                SpdmRequestResponseCode::SpdmResponseVersion => {
                    let version_rsp =
                        SpdmVersionResponsePayload::spdm_read(&mut self.common, &mut reader);
                    let used = reader.used();
                    if let Some(version_rsp) = version_rsp {
                        debug!("!!! version rsp : {:02x?}\n", version_rsp);

                        let mut selected: Option<SpdmVersion> = None;
                        for entry in version_rsp
                            .versions
                            .iter()
                            .take(version_rsp.version_number_entry_count as usize)
                        {
                            let offered = entry.version;
                            if !self
                                .common
                                .config_info
                                .spdm_version
                                .iter()
                                .any(|local| *local == offered)
                            {
                                continue;
                            }
                            match selected {
                                Some(current) if current.get_u8() >= offered.get_u8() => {}
                                _ => selected = Some(offered),
                            }
                        }

                        let version_sel = match selected {
                            Some(version) => version,
                            None => {
                                error!("no common version with peer\n");
                                self.common.runtime_info.set_connection_state(
                                    SpdmConnectionState::SpdmConnectionAfterVersion,
                                );
                                return spdm_result_err!(Unsupported);
                            }
                        };
                        self.common.negotiate_info.spdm_version_sel = version_sel;
                        info!("selected spdm version {:02x}\n", version_sel.get_u8());

                        self.common.append_message_a(send_buffer)?;
                        self.common.append_message_a(&receive_buffer[..used])?;
                        self.common
                            .runtime_info
                            .set_connection_state(SpdmConnectionState::SpdmConnectionAfterVersion);
                        Ok(())
                    } else {
                        error!("!!! version : fail !!!\n");
                        spdm_result_err!(InvalidMessageField)
                    }
                }
                SpdmRequestResponseCode::SpdmResponseError => {
                    let received = self.spdm_handle_error_response_main(
                        None,
                        receive_buffer,
                        SpdmRequestResponseCode::SpdmRequestGetVersion,
                        SpdmRequestResponseCode::SpdmResponseVersion,
                    )?;
                    self.handle_spdm_version_response(send_buffer, received.as_ref())
                }
                _ => spdm_result_err!(InvalidMessageField),
            },
            None => spdm_result_err!(InvalidMessageField),
        }
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::common::SpdmConnectionState;
    use crate::responder;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_version() {
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
        assert_eq!(
            requester.common.negotiate_info.spdm_version_sel,
            SpdmVersion::SpdmVersion11
        );
        assert_eq!(
            requester.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAfterVersion
        );
        assert!(requester.common.runtime_info.message_a.data_size() > 0);
    }

    #[test]
    fn test_case1_version_intersection_empty() {
        // responder only offers 1.1; requester only accepts 1.0
        let (rsp_config_info, rsp_provision_info) = create_info();
        let (mut req_config_info, req_provision_info) = create_info();
        req_config_info.spdm_version = [SpdmVersion::SpdmVersion10; config::MAX_SPDM_VERSION_COUNT];

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
        responder.common.config_info.spdm_version =
            [SpdmVersion::SpdmVersion11; config::MAX_SPDM_VERSION_COUNT];

        let transport_encap2 = &mut TestTransportEncap;
        let mut device_io_requester = FakeSpdmDeviceIo::new(&shared_buffer, &mut responder);

        let mut requester = RequesterContext::new(
            &mut device_io_requester,
            transport_encap2,
            req_config_info,
            req_provision_info,
        );

        let status = requester.send_receive_spdm_version();
        assert_eq!(status, spdm_result_err!(Unsupported));
        assert_eq!(
            requester.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAfterVersion
        );
    }
}
