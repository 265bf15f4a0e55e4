// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_end_session(&mut self, session_id: u32, bytes: &[u8]) -> SpdmResult {
        info!("got spdm end_session\n");
        {
            let session = match self.common.get_immutable_session_via_id(session_id) {
                Some(session) => session,
                None => {
                    return self.send_spdm_error(
                        None,
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
            if session.get_session_state() != SpdmSessionState::SpdmSessionEstablished {
                return self.send_spdm_error(
                    Some(session_id),
                    SpdmErrorCode::SpdmErrorUnexpectedRequest,
                    0,
                );
            }
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        if SpdmEndSessionRequestPayload::spdm_read(&mut self.common, &mut reader).is_none() {
            return self.send_spdm_error(
                Some(session_id),
                SpdmErrorCode::SpdmErrorInvalidRequest,
                0,
            );
        }

        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or_else(|| spdm_err!(SessionRequired))?;
        session.set_session_state(SpdmSessionState::SpdmSessionEndSessionReceived);

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseEndSessionAck,
            },
            payload: SpdmMessagePayload::SpdmEndSessionResponse(SpdmEndSessionResponsePayload {}),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();
        self.send_secured_message(session_id, &send_buffer[..used], false)?;

        // ack delivered: the session and its secrets are gone
        self.common.remove_session_via_id(session_id);
        Ok(())
    }
}
