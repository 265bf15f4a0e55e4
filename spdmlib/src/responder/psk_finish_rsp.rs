// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::common::ManagedBufferF;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_psk_finish(&mut self, session_id: u32, bytes: &[u8]) -> SpdmResult {
        info!("got spdm psk_finish\n");
        let (use_psk, message_k, session_state) = {
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
            (
                session.use_psk,
                session.runtime_info.message_k,
                session.get_session_state(),
            )
        };
        if session_state != SpdmSessionState::SpdmSessionHandshaking || !use_psk {
            return self.send_spdm_error(
                Some(session_id),
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            );
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let psk_finish =
            match SpdmPskFinishRequestPayload::spdm_read(&mut self.common, &mut reader) {
                Some(psk_finish) => psk_finish,
                None => {
                    return self.send_spdm_error(
                        Some(session_id),
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
        let used = reader.used();
        let base_hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;

        let mut message_f = ManagedBufferF::default();
        message_f
            .append_message(&bytes[..used - base_hash_size])
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let transcript_hash =
            self.common
                .calc_rsp_transcript_hash(true, 0, &message_k, Some(&message_f))?;
        {
            let session = self
                .common
                .get_immutable_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            if session
                .verify_hmac_with_request_finished_key(
                    transcript_hash.as_ref(),
                    &psk_finish.verify_data,
                )
                .is_err()
            {
                error!("verify_hmac_with_request_finished_key fail\n");
                self.send_spdm_error(
                    Some(session_id),
                    SpdmErrorCode::SpdmErrorDecryptError,
                    0,
                )?;
                self.common.remove_session_via_id(session_id);
                return Ok(());
            }
        }
        info!("verify_hmac_with_request_finished_key pass\n");
        message_f
            .append_message(psk_finish.verify_data.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponsePskFinishRsp,
            },
            payload: SpdmMessagePayload::SpdmPskFinishResponse(SpdmPskFinishResponsePayload {}),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let response_used = writer.used();

        message_f
            .append_message(&send_buffer[..response_used])
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let th2 = self
            .common
            .calc_rsp_transcript_hash(true, 0, &message_k, Some(&message_f))?;
        debug!("!!! th2 : {:02x?}\n", th2.as_ref());
        {
            let session = self
                .common
                .get_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            session.runtime_info.message_f = message_f;
            session.generate_data_secret(&th2)?;
        }

        self.send_secured_message(session_id, &send_buffer[..response_used], false)?;
        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or_else(|| spdm_err!(SessionRequired))?;
        session.set_session_state(SpdmSessionState::SpdmSessionEstablished);
        Ok(())
    }
}
