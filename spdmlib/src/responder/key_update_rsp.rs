// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_key_update(&mut self, session_id: u32, bytes: &[u8]) -> SpdmResult {
        info!("got spdm key_update\n");
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
        if !self
            .common
            .negotiate_info
            .rsp_capabilities_sel
            .contains(SpdmResponseCapabilityFlags::KEY_UPD_CAP)
        {
            return self.send_spdm_error(
                Some(session_id),
                SpdmErrorCode::SpdmErrorUnsupportedRequest,
                0,
            );
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let key_update =
            match SpdmKeyUpdateRequestPayload::spdm_read(&mut self.common, &mut reader) {
                Some(key_update) => key_update,
                None => {
                    return self.send_spdm_error(
                        Some(session_id),
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
        debug!("!!! key_update : {:02x?}\n", key_update);

        // the request itself was opened with the old request-direction
        // keys; rotate before answering so the next inbound record (and,
        // for update-all, this ACK) runs on the new generation
        let (update_requester, update_responder) = match key_update.key_update_operation {
            SpdmKeyUpdateOperation::SpdmUpdateKey => (true, false),
            SpdmKeyUpdateOperation::SpdmUpdateAllKeys => (true, true),
            SpdmKeyUpdateOperation::SpdmVerifyNewKey => (false, false),
            _ => {
                return self.send_spdm_error(
                    Some(session_id),
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                )
            }
        };
        if update_requester || update_responder {
            let session = self
                .common
                .get_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            session.create_data_secret_update(update_requester, update_responder)?;
            session.activate_data_secret_update(update_requester, update_responder, true)?;
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseKeyUpdateAck,
            },
            payload: SpdmMessagePayload::SpdmKeyUpdateResponse(SpdmKeyUpdateResponsePayload {
                key_update_operation: key_update.key_update_operation,
                tag: key_update.tag,
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();
        self.send_secured_message(session_id, &send_buffer[..used], false)
    }
}
