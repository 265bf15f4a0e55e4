// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmConnectionState, SpdmOpaqueStruct};
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_key_exchange(
        &mut self,
        slot_id: u8,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult<u32> {
        info!("send spdm key exchange\n");
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER {
            return spdm_result_err!(InvalidParameter);
        }
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return spdm_result_err!(InvalidParameter);
        }
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::KEY_EX_CAP)
            || !self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::KEY_EX_CAP)
        {
            return spdm_result_err!(Unsupported);
        }
        if self.common.peer_info.peer_cert_chain[slot_id as usize].is_none() {
            return spdm_result_err!(InvalidParameter);
        }

        self.common.runtime_info.need_measurement_summary_hash = measurement_summary_hash_type
            != SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone;

        let mut random = [0u8; SPDM_RANDOM_SIZE];
        crypto::rand::get_random(&mut random)?;
        let mut session_id_raw = [0u8; 2];
        crypto::rand::get_random(&mut session_id_raw)?;
        let req_session_id = u16::from_le_bytes(session_id_raw) | 1;

        let (exchange, key_exchange_context) =
            crypto::dhe::generate_key_pair(self.common.negotiate_info.dhe_sel)
                .ok_or_else(|| spdm_err!(Unsupported))?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestKeyExchange,
            },
            payload: SpdmMessagePayload::SpdmKeyExchangeRequest(SpdmKeyExchangeRequestPayload {
                measurement_summary_hash_type,
                slot_id,
                req_session_id,
                random: SpdmRandomStruct { data: random },
                exchange,
                opaque: SpdmOpaqueStruct::default(),
            }),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_message(&send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_message(&mut receive_buffer)?;

        self.handle_spdm_key_exchange_response(
            slot_id,
            req_session_id,
            key_exchange_context,
            &send_buffer[..send_used],
            &receive_buffer[..receive_used],
        )
    }

    fn handle_spdm_key_exchange_response(
        &mut self,
        slot_id: u8,
        req_session_id: u16,
        key_exchange_context: Box<dyn crate::crypto::SpdmDheKeyExchange>,
        send_buffer: &[u8],
        receive_buffer: &[u8],
    ) -> SpdmResult<u32> {
        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.version != self.common.negotiate_info.spdm_version_sel {
                    return spdm_result_err!(InvalidMessageField);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseKeyExchangeRsp => {
                        let key_exchange_rsp = SpdmKeyExchangeResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        );
                        let receive_used = reader.used();
                        if let Some(key_exchange_rsp) = key_exchange_rsp {
                            debug!("!!! key_exchange rsp : {:02x?}\n", key_exchange_rsp);

                            let base_hash_size =
                                self.common.negotiate_info.base_hash_sel.get_size() as usize;
                            let base_asym_size =
                                self.common.negotiate_info.base_asym_sel.get_size() as usize;

                            let dhe_secret = key_exchange_context
                                .compute_final_key(&key_exchange_rsp.exchange)
                                .ok_or_else(|| spdm_err!(SecurityViolation))?;
                            debug!("!!! dhe_secret derived\n");

                            let session_id = ((key_exchange_rsp.rsp_session_id as u32) << 16)
                                | req_session_id as u32;

                            // transcript K: request, then response up to
                            // (excluding) signature and verify_data
                            let mut message_k = crate::common::ManagedBufferK::default();
                            message_k
                                .append_message(send_buffer)
                                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
                            let temp_used = receive_used - base_asym_size - base_hash_size;
                            message_k
                                .append_message(&receive_buffer[..temp_used])
                                .ok_or_else(|| spdm_err!(BufferTooSmall))?;

                            // signature covers TH1 without its own bytes
                            let transcript = self.common.calc_req_transcript_data(
                                false,
                                slot_id,
                                &message_k,
                                None,
                            )?;
                            let peer_cert_chain = self.common.peer_info.peer_cert_chain
                                [slot_id as usize]
                                .as_ref()
                                .ok_or_else(|| spdm_err!(InvalidParameter))?;
                            let cert_chain_data = &peer_cert_chain.data
                                [4 + base_hash_size..peer_cert_chain.data_size as usize];
                            if crypto::asym_verify::verify(
                                self.common.negotiate_info.base_hash_sel,
                                self.common.negotiate_info.base_asym_sel,
                                cert_chain_data,
                                transcript.as_ref(),
                                &key_exchange_rsp.signature,
                            )
                            .is_err()
                            {
                                error!("verify key_exchange signature fail\n");
                                return spdm_result_err!(SecurityViolation);
                            }
                            info!("verify key_exchange signature pass\n");
                            message_k
                                .append_message(key_exchange_rsp.signature.as_ref())
                                .ok_or_else(|| spdm_err!(BufferTooSmall))?;

                            // the session owns the secrets from here on
                            let base_hash_sel = self.common.negotiate_info.base_hash_sel;
                            let dhe_sel = self.common.negotiate_info.dhe_sel;
                            let aead_sel = self.common.negotiate_info.aead_sel;
                            let key_schedule_sel =
                                self.common.negotiate_info.key_schedule_sel;
                            let th1 = self.common.calc_req_transcript_hash(
                                false,
                                slot_id,
                                &message_k,
                                None,
                            )?;
                            debug!("!!! th1 : {:02x?}\n", th1.as_ref());

                            let mut_auth_requested = key_exchange_rsp
                                .mut_auth_req
                                .contains(
                                    SpdmKeyExchangeMutAuthAttributes::MUT_AUTH_REQ_WITH_ENCAP_REQUEST,
                                );

                            let session = self
                                .common
                                .get_next_avaiable_session()
                                .ok_or_else(|| spdm_err!(DeviceError))?;
                            session.setup(session_id)?;
                            session.set_use_psk(false);
                            session.slot_id = slot_id;
                            session.req_slot_id = key_exchange_rsp.req_slot_id;
                            session.mut_auth_requested = mut_auth_requested;
                            session.heartbeat_period = key_exchange_rsp.heartbeat_period;
                            session.set_crypto_param(
                                base_hash_sel,
                                dhe_sel,
                                aead_sel,
                                key_schedule_sel,
                            );
                            session.set_dhe_secret(dhe_secret);
                            session.generate_handshake_secret(&th1)?;

                            // ResponderVerifyData is keyed on the
                            // including-signature transcript hash
                            let session = self
                                .common
                                .get_session_via_id(session_id)
                                .ok_or_else(|| spdm_err!(SessionRequired))?;
                            if session
                                .verify_hmac_with_response_finished_key(
                                    th1.as_ref(),
                                    &key_exchange_rsp.verify_data,
                                )
                                .is_err()
                            {
                                error!("verify_hmac_with_response_finished_key fail\n");
                                session.teardown();
                                return spdm_result_err!(SecurityViolation);
                            }
                            info!("verify_hmac_with_response_finished_key pass\n");

                            message_k
                                .append_message(key_exchange_rsp.verify_data.as_ref())
                                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
                            session.runtime_info.message_k = message_k;
                            session.set_session_state(SpdmSessionState::SpdmSessionHandshaking);

                            Ok(session_id)
                        } else {
                            error!("!!! key_exchange : fail !!!\n");
                            spdm_result_err!(InvalidMessageField)
                        }
                    }
                    SpdmRequestResponseCode::SpdmResponseError => {
                        let received = self.spdm_handle_error_response_main(
                            None,
                            receive_buffer,
                            SpdmRequestResponseCode::SpdmRequestKeyExchange,
                            SpdmRequestResponseCode::SpdmResponseKeyExchangeRsp,
                        )?;
                        self.handle_spdm_key_exchange_response(
                            slot_id,
                            req_session_id,
                            key_exchange_context,
                            send_buffer,
                            received.as_ref(),
                        )
                    }
                    _ => spdm_result_err!(InvalidMessageField),
                }
            }
            None => spdm_result_err!(InvalidMessageField),
        }
    }
}
