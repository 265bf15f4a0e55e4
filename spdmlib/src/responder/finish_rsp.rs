// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::common::ManagedBufferF;
use crate::crypto;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_finish(&mut self, session_id: u32, bytes: &[u8]) -> SpdmResult {
        info!("got spdm finish\n");
        let (slot_id, use_psk, mut_auth_requested, message_k, session_state) = {
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
                session.slot_id,
                session.use_psk,
                session.mut_auth_requested,
                session.runtime_info.message_k,
                session.get_session_state(),
            )
        };
        if session_state != SpdmSessionState::SpdmSessionHandshaking || use_psk {
            return self.send_spdm_error(
                Some(session_id),
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            );
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let finish = match SpdmFinishRequestPayload::spdm_read(&mut self.common, &mut reader) {
            Some(finish) => finish,
            None => {
                return self.send_spdm_error(
                    Some(session_id),
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                )
            }
        };
        debug!("!!! finish : {:02x?}\n", finish);
        let used = reader.used();

        let base_hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;
        let signature_included = finish
            .finish_request_attributes
            .contains(SpdmFinishRequestAttributes::SIGNATURE_INCLUDED);
        if mut_auth_requested != signature_included {
            return self.send_spdm_error(
                Some(session_id),
                SpdmErrorCode::SpdmErrorInvalidRequest,
                0,
            );
        }
        let req_asym_size = if signature_included {
            self.common.negotiate_info.req_asym_sel.get_size() as usize
        } else {
            0
        };

        let mut message_f = ManagedBufferF::default();
        message_f
            .append_message(&bytes[..used - base_hash_size - req_asym_size])
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        if signature_included {
            let transcript = self.common.calc_rsp_transcript_data(
                false,
                slot_id,
                &message_k,
                Some(&message_f),
            )?;
            let req_slot_id = finish.req_slot_id;
            let peer_cert_chain = match self.common.peer_info.peer_cert_chain
                [req_slot_id as usize]
                .as_ref()
            {
                Some(peer_cert_chain) => peer_cert_chain,
                None => {
                    error!("no requester cert chain for mutual auth\n");
                    self.send_spdm_error(
                        Some(session_id),
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )?;
                    self.common.remove_session_via_id(session_id);
                    return Ok(());
                }
            };
            let cert_chain_data =
                &peer_cert_chain.data[4 + base_hash_size..peer_cert_chain.data_size as usize];
            if crypto::asym_verify::verify(
                self.common.negotiate_info.base_hash_sel,
                self.common.negotiate_info.req_asym_sel.to_base_asym(),
                cert_chain_data,
                transcript.as_ref(),
                &finish.signature,
            )
            .is_err()
            {
                error!("verify finish signature fail\n");
                self.send_spdm_error(
                    Some(session_id),
                    SpdmErrorCode::SpdmErrorDecryptError,
                    0,
                )?;
                self.common.remove_session_via_id(session_id);
                return Ok(());
            }
            info!("verify finish signature pass\n");
            message_f
                .append_message(finish.signature.as_ref())
                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        }

        // RequesterVerifyData over the partial TH2 hash
        let transcript_hash = self.common.calc_rsp_transcript_hash(
            false,
            slot_id,
            &message_k,
            Some(&message_f),
        )?;
        {
            let session = self
                .common
                .get_immutable_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            if session
                .verify_hmac_with_request_finished_key(
                    transcript_hash.as_ref(),
                    &finish.verify_data,
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
            .append_message(finish.verify_data.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseFinishRsp,
            },
            payload: SpdmMessagePayload::SpdmFinishResponse(SpdmFinishResponsePayload {}),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let response_used = writer.used();

        message_f
            .append_message(&send_buffer[..response_used])
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let th2 = self.common.calc_rsp_transcript_hash(
            false,
            slot_id,
            &message_k,
            Some(&message_f),
        )?;
        debug!("!!! th2 : {:02x?}\n", th2.as_ref());
        {
            let session = self
                .common
                .get_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            session.runtime_info.message_f = message_f;
            session.generate_data_secret(&th2)?;
        }

        // the reply still rides the handshake keys; the switch to data
        // keys happens with the state change below
        self.send_secured_message(session_id, &send_buffer[..response_used], false)?;
        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or_else(|| spdm_err!(SessionRequired))?;
        session.set_session_state(SpdmSessionState::SpdmSessionEstablished);
        Ok(())
    }
}
