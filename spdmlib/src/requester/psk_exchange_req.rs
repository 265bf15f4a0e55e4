// Copyright (c) 2021 Intel Corporation
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
    pub fn send_receive_spdm_psk_exchange(
        &mut self,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult<u32> {
        info!("send spdm psk exchange\n");
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return spdm_result_err!(InvalidParameter);
        }
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::PSK_CAP)
            || !(self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::PSK_CAP_WITHOUT_CONTEXT)
                || self
                    .common
                    .negotiate_info
                    .rsp_capabilities_sel
                    .contains(SpdmResponseCapabilityFlags::PSK_CAP_WITH_CONTEXT))
        {
            return spdm_result_err!(Unsupported);
        }
        if self.common.config_info.psk.data_size == 0 {
            return spdm_result_err!(InvalidParameter);
        }

        self.common.runtime_info.need_measurement_summary_hash = measurement_summary_hash_type
            != SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone;

        let mut session_id_raw = [0u8; 2];
        crypto::rand::get_random(&mut session_id_raw)?;
        let req_session_id = u16::from_le_bytes(session_id_raw) | 1;

        let mut psk_context = [0u8; 32];
        crypto::rand::get_random(&mut psk_context)?;

        let psk_hint = SpdmPskHintWireStruct::from_data(self.common.config_info.psk_hint.as_ref());

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestPskExchange,
            },
            payload: SpdmMessagePayload::SpdmPskExchangeRequest(SpdmPskExchangeRequestPayload {
                measurement_summary_hash_type,
                req_session_id,
                psk_hint,
                psk_context: SpdmPskContextStruct::from_data(&psk_context),
                opaque: SpdmOpaqueStruct::default(),
            }),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_message(&send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_message(&mut receive_buffer)?;
        self.handle_spdm_psk_exchange_response(
            req_session_id,
            &send_buffer[..send_used],
            &receive_buffer[..receive_used],
        )
    }

    fn handle_spdm_psk_exchange_response(
        &mut self,
        req_session_id: u16,
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
                    SpdmRequestResponseCode::SpdmResponsePskExchangeRsp => {
                        let psk_exchange_rsp = SpdmPskExchangeResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        );
                        let receive_used = reader.used();
                        if let Some(psk_exchange_rsp) = psk_exchange_rsp {
                            debug!("!!! psk_exchange rsp : {:02x?}\n", psk_exchange_rsp);

                            let base_hash_size =
                                self.common.negotiate_info.base_hash_sel.get_size() as usize;
                            let session_id = ((psk_exchange_rsp.rsp_session_id as u32) << 16)
                                | req_session_id as u32;

                            let mut message_k = crate::common::ManagedBufferK::default();
                            message_k
                                .append_message(send_buffer)
                                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
                            message_k
                                .append_message(&receive_buffer[..receive_used - base_hash_size])
                                .ok_or_else(|| spdm_err!(BufferTooSmall))?;

                            let base_hash_sel = self.common.negotiate_info.base_hash_sel;
                            let dhe_sel = self.common.negotiate_info.dhe_sel;
                            let aead_sel = self.common.negotiate_info.aead_sel;
                            let key_schedule_sel =
                                self.common.negotiate_info.key_schedule_sel;
                            let psk = self.common.config_info.psk;

                            let th1 = self.common.calc_req_transcript_hash(
                                true,
                                0,
                                &message_k,
                                None,
                            )?;
                            debug!("!!! th1 : {:02x?}\n", th1.as_ref());

                            let session = self
                                .common
                                .get_next_avaiable_session()
                                .ok_or_else(|| spdm_err!(DeviceError))?;
                            session.setup(session_id)?;
                            session.set_use_psk(true);
                            session.heartbeat_period = psk_exchange_rsp.heartbeat_period;
                            session.set_crypto_param(
                                base_hash_sel,
                                dhe_sel,
                                aead_sel,
                                key_schedule_sel,
                            );
                            session.set_dhe_secret(SpdmDheFinalKeyStruct::from_data(
                                psk.as_ref(),
                            ));
                            session.generate_handshake_secret(&th1)?;

                            if session
                                .verify_hmac_with_response_finished_key(
                                    th1.as_ref(),
                                    &psk_exchange_rsp.verify_data,
                                )
                                .is_err()
                            {
                                error!("verify_hmac_with_response_finished_key fail\n");
                                session.teardown();
                                return spdm_result_err!(SecurityViolation);
                            }
                            info!("verify_hmac_with_response_finished_key pass\n");

                            message_k
                                .append_message(psk_exchange_rsp.verify_data.as_ref())
                                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
                            session.runtime_info.message_k = message_k;
                            session.set_session_state(SpdmSessionState::SpdmSessionHandshaking);

                            Ok(session_id)
                        } else {
                            error!("!!! psk_exchange : fail !!!\n");
                            spdm_result_err!(InvalidMessageField)
                        }
                    }
                    SpdmRequestResponseCode::SpdmResponseError => {
                        let received = self.spdm_handle_error_response_main(
                            None,
                            receive_buffer,
                            SpdmRequestResponseCode::SpdmRequestPskExchange,
                            SpdmRequestResponseCode::SpdmResponsePskExchangeRsp,
                        )?;
                        self.handle_spdm_psk_exchange_response(
                            req_session_id,
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
