// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::common::ManagedBufferF;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_psk_finish(&mut self, session_id: u32) -> SpdmResult {
        info!("send spdm psk finish\n");
        let message_k = {
            let session = self
                .common
                .get_immutable_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            if session.get_session_state() != SpdmSessionState::SpdmSessionHandshaking
                || !session.use_psk
            {
                return spdm_result_err!(InvalidParameter);
            }
            session.runtime_info.message_k
        };

        let base_hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestPskFinish,
            },
            payload: SpdmMessagePayload::SpdmPskFinishRequest(SpdmPskFinishRequestPayload {
                verify_data: SpdmDigestStruct {
                    data_size: base_hash_size as u16,
                    data: [0xcc; SPDM_MAX_HASH_SIZE],
                },
            }),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();

        let mut message_f = ManagedBufferF::default();
        message_f
            .append_message(&send_buffer[..send_used - base_hash_size])
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let transcript_hash =
            self.common
                .calc_req_transcript_hash(true, 0, &message_k, Some(&message_f))?;
        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or_else(|| spdm_err!(SessionRequired))?;
        let hmac = session.generate_hmac_with_request_finished_key(transcript_hash.as_ref())?;
        message_f
            .append_message(hmac.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        send_buffer[(send_used - base_hash_size)..send_used].copy_from_slice(hmac.as_ref());

        self.send_secured_message(session_id, &send_buffer[..send_used], false)?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_secured_message(session_id, &mut receive_buffer)?;

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => match message_header.request_response_code {
                SpdmRequestResponseCode::SpdmResponsePskFinishRsp => {
                    let psk_finish_rsp =
                        SpdmPskFinishResponsePayload::spdm_read(&mut self.common, &mut reader);
                    let receive_used = reader.used();
                    if psk_finish_rsp.is_some() {
                        message_f
                            .append_message(&receive_buffer[..receive_used])
                            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

                        let th2 = self.common.calc_req_transcript_hash(
                            true,
                            0,
                            &message_k,
                            Some(&message_f),
                        )?;
                        debug!("!!! th2 : {:02x?}\n", th2.as_ref());
                        let session = self
                            .common
                            .get_session_via_id(session_id)
                            .ok_or_else(|| spdm_err!(SessionRequired))?;
                        session.runtime_info.message_f = message_f;
                        session.generate_data_secret(&th2)?;
                        session.set_session_state(SpdmSessionState::SpdmSessionEstablished);
                        Ok(())
                    } else {
                        error!("!!! psk_finish : fail !!!\n");
                        spdm_result_err!(InvalidMessageField)
                    }
                }
                SpdmRequestResponseCode::SpdmResponseError => {
                    let status = self.spdm_handle_error_response_main(
                        Some(session_id),
                        &receive_buffer[..receive_used],
                        SpdmRequestResponseCode::SpdmRequestPskFinish,
                        SpdmRequestResponseCode::SpdmResponsePskFinishRsp,
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
