// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_end_session(&mut self, session_id: u32) -> SpdmResult {
        info!("send spdm end_session\n");
        {
            let session = self
                .common
                .get_immutable_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            if session.get_session_state() != SpdmSessionState::SpdmSessionEstablished {
                return spdm_result_err!(SessionRequired);
            }
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestEndSession,
            },
            payload: SpdmMessagePayload::SpdmEndSessionRequest(SpdmEndSessionRequestPayload {
                end_session_request_attributes: SpdmEndSessionRequestAttributes::empty(),
            }),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_secured_message(session_id, &send_buffer[..send_used], false)?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_secured_message(session_id, &mut receive_buffer)?;

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => match message_header.request_response_code {
                SpdmRequestResponseCode::SpdmResponseEndSessionAck => {
                    SpdmEndSessionResponsePayload::spdm_read(&mut self.common, &mut reader)
                        .ok_or_else(|| spdm_err!(InvalidMessageField))?;
                    // all session secrets die with the ack
                    self.common.remove_session_via_id(session_id);
                    Ok(())
                }
                SpdmRequestResponseCode::SpdmResponseError => {
                    let status = self.spdm_handle_error_response_main(
                        Some(session_id),
                        &receive_buffer[..receive_used],
                        SpdmRequestResponseCode::SpdmRequestEndSession,
                        SpdmRequestResponseCode::SpdmResponseEndSessionAck,
                    );
                    match status {
                        Err(err) => Err(err),
                        Ok(_) => spdm_result_err!(SecurityViolation),
                    }
                }
                _ => spdm_result_err!(InvalidMessageField),
            },
            None => spdm_result_err!(InvalidMessageField),
        }
    }
}
