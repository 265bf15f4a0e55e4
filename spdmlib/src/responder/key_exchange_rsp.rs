// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmConnectionState, SpdmEncapState, SpdmOpaqueStruct, SpdmResponseState};
use crate::crypto;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::secret;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_key_exchange(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm key_exchange\n");
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnexpectedRequest, 0);
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
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnsupportedRequest, 0);
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let key_exchange =
            match SpdmKeyExchangeRequestPayload::spdm_read(&mut self.common, &mut reader) {
                Some(key_exchange) => key_exchange,
                None => {
                    return self.send_spdm_error(
                        None,
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
        debug!("!!! key_exchange : {:02x?}\n", key_exchange);

        let slot_id = key_exchange.slot_id;
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER
            || self.common.provision_info.my_cert_chain[slot_id as usize].is_none()
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }
        if self.common.get_next_avaiable_session().is_none() {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorSessionLimitExceeded, 0);
        }

        self.common.runtime_info.need_measurement_summary_hash = key_exchange
            .measurement_summary_hash_type
            != SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone;

        let measurement_summary_hash = if self.common.runtime_info.need_measurement_summary_hash {
            match secret::measurement::generate_measurement_summary_hash(
                self.common.negotiate_info.spdm_version_sel,
                self.common.negotiate_info.base_hash_sel,
                self.common.negotiate_info.measurement_specification_sel,
                self.common.negotiate_info.measurement_hash_sel,
                key_exchange.measurement_summary_hash_type.get_u8(),
            ) {
                Some(hash) => hash,
                None => {
                    return self.send_spdm_error(
                        None,
                        SpdmErrorCode::SpdmErrorUnspecified,
                        0,
                    )
                }
            }
        } else {
            SpdmDigestStruct::default()
        };

        let (exchange, key_exchange_context) =
            match crypto::dhe::generate_key_pair(self.common.negotiate_info.dhe_sel) {
                Some(pair) => pair,
                None => {
                    return self.send_spdm_error(
                        None,
                        SpdmErrorCode::SpdmErrorUnsupportedRequest,
                        0,
                    )
                }
            };
        let dhe_secret = match key_exchange_context.compute_final_key(&key_exchange.exchange) {
            Some(dhe_secret) => dhe_secret,
            None => {
                return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0)
            }
        };

        let mut random = [0u8; SPDM_RANDOM_SIZE];
        crypto::rand::get_random(&mut random)?;
        let mut rsp_session_id_raw = [0u8; 2];
        crypto::rand::get_random(&mut rsp_session_id_raw)?;
        let rsp_session_id = u16::from_le_bytes(rsp_session_id_raw) | 1;
        let session_id = ((rsp_session_id as u32) << 16) | key_exchange.req_session_id as u32;

        let mut_auth_requested = self.common.config_info.mut_auth_requested
            && self
                .common
                .negotiate_info
                .req_capabilities_sel
                .contains(SpdmRequestCapabilityFlags::MUT_AUTH_CAP)
            && self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::MUT_AUTH_CAP)
            && self
                .common
                .negotiate_info
                .req_capabilities_sel
                .contains(SpdmRequestCapabilityFlags::ENCAP_CAP);
        let mut_auth_req = if mut_auth_requested {
            SpdmKeyExchangeMutAuthAttributes::MUT_AUTH_REQ_WITH_ENCAP_REQUEST
        } else {
            SpdmKeyExchangeMutAuthAttributes::empty()
        };

        let heartbeat_period = self.common.config_info.heartbeat_period;
        let base_hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;
        let base_asym_size = self.common.negotiate_info.base_asym_sel.get_size() as usize;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseKeyExchangeRsp,
            },
            payload: SpdmMessagePayload::SpdmKeyExchangeResponse(
                SpdmKeyExchangeResponsePayload {
                    heartbeat_period,
                    rsp_session_id,
                    mut_auth_req,
                    req_slot_id: 0,
                    random: SpdmRandomStruct { data: random },
                    exchange,
                    measurement_summary_hash,
                    opaque: SpdmOpaqueStruct::default(),
                    signature: SpdmSignatureStruct {
                        data_size: base_asym_size as u16,
                        ..Default::default()
                    },
                    verify_data: SpdmDigestStruct {
                        data_size: base_hash_size as u16,
                        ..Default::default()
                    },
                },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        // transcript K: request, then response minus signature and
        // verify_data
        let mut message_k = crate::common::ManagedBufferK::default();
        message_k
            .append_message(bytes)
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        message_k
            .append_message(&send_buffer[..used - base_asym_size - base_hash_size])
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let transcript =
            self.common
                .calc_rsp_transcript_data(false, slot_id, &message_k, None)?;
        let signature = match crypto::asym_sign::sign(
            self.common.negotiate_info.base_hash_sel,
            self.common.negotiate_info.base_asym_sel,
            transcript.as_ref(),
        ) {
            Some(signature) => signature,
            None => {
                error!("key_exchange signing fail\n");
                return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnspecified, 0);
            }
        };
        let signature_offset = used - base_asym_size - base_hash_size;
        send_buffer[signature_offset..signature_offset + base_asym_size]
            .copy_from_slice(signature.as_ref());
        message_k
            .append_message(signature.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let th1 = self
            .common
            .calc_rsp_transcript_hash(false, slot_id, &message_k, None)?;
        debug!("!!! th1 : {:02x?}\n", th1.as_ref());

        let base_hash_sel = self.common.negotiate_info.base_hash_sel;
        let dhe_sel = self.common.negotiate_info.dhe_sel;
        let aead_sel = self.common.negotiate_info.aead_sel;
        let key_schedule_sel = self.common.negotiate_info.key_schedule_sel;

        let session = self
            .common
            .get_next_avaiable_session()
            .ok_or_else(|| spdm_err!(DeviceError))?;
        session.setup(session_id)?;
        session.set_use_psk(false);
        session.slot_id = slot_id;
        session.mut_auth_requested = mut_auth_requested;
        session.heartbeat_period = heartbeat_period;
        session.set_crypto_param(base_hash_sel, dhe_sel, aead_sel, key_schedule_sel);
        session.set_dhe_secret(dhe_secret);
        session.generate_handshake_secret(&th1)?;
        let verify_data = session.generate_hmac_with_response_finished_key(th1.as_ref())?;
        send_buffer[used - base_hash_size..used].copy_from_slice(verify_data.as_ref());
        message_k
            .append_message(verify_data.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        session.runtime_info.message_k = message_k;
        session.set_session_state(SpdmSessionState::SpdmSessionHandshaking);

        if mut_auth_requested {
            self.common
                .runtime_info
                .set_response_state(SpdmResponseState::SpdmResponseStateProcessingEncap);
            self.common.encap_context = crate::common::SpdmEncapContext::default();
            self.common.encap_context.encap_state = SpdmEncapState::SpdmEncapGetDigest;
            self.common.encap_context.request_id = 1;
        }

        self.send_message(&send_buffer[..used])
    }
}
