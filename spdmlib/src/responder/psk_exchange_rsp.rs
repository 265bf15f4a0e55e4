// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmConnectionState, SpdmOpaqueStruct};
use crate::crypto;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::secret;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_psk_exchange(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm psk_exchange\n");
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnexpectedRequest, 0);
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
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnsupportedRequest, 0);
        }
        if self.common.config_info.psk.data_size == 0 {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnsupportedRequest, 0);
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let psk_exchange =
            match SpdmPskExchangeRequestPayload::spdm_read(&mut self.common, &mut reader) {
                Some(psk_exchange) => psk_exchange,
                None => {
                    return self.send_spdm_error(
                        None,
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
        debug!("!!! psk_exchange : {:02x?}\n", psk_exchange);

        // the hint picks the PSK; a mismatch means no shared secret
        if psk_exchange.psk_hint.as_ref() != self.common.config_info.psk_hint.as_ref() {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }
        if self.common.get_next_avaiable_session().is_none() {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorSessionLimitExceeded, 0);
        }

        self.common.runtime_info.need_measurement_summary_hash = psk_exchange
            .measurement_summary_hash_type
            != SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone;

        let measurement_summary_hash = if self.common.runtime_info.need_measurement_summary_hash {
            match secret::measurement::generate_measurement_summary_hash(
                self.common.negotiate_info.spdm_version_sel,
                self.common.negotiate_info.base_hash_sel,
                self.common.negotiate_info.measurement_specification_sel,
                self.common.negotiate_info.measurement_hash_sel,
                psk_exchange.measurement_summary_hash_type.get_u8(),
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

        let mut rsp_session_id_raw = [0u8; 2];
        crypto::rand::get_random(&mut rsp_session_id_raw)?;
        let rsp_session_id = u16::from_le_bytes(rsp_session_id_raw) | 1;
        let session_id = ((rsp_session_id as u32) << 16) | psk_exchange.req_session_id as u32;

        let mut rsp_context = [0u8; 32];
        crypto::rand::get_random(&mut rsp_context)?;

        let heartbeat_period = self.common.config_info.heartbeat_period;
        let base_hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponsePskExchangeRsp,
            },
            payload: SpdmMessagePayload::SpdmPskExchangeResponse(
                SpdmPskExchangeResponsePayload {
                    heartbeat_period,
                    rsp_session_id,
                    measurement_summary_hash,
                    psk_context: SpdmPskContextStruct::from_data(&rsp_context),
                    opaque: SpdmOpaqueStruct::default(),
                    verify_data: SpdmDigestStruct {
                        data_size: base_hash_size as u16,
                        ..Default::default()
                    },
                },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        let mut message_k = crate::common::ManagedBufferK::default();
        message_k
            .append_message(bytes)
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        message_k
            .append_message(&send_buffer[..used - base_hash_size])
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;

        let th1 = self
            .common
            .calc_rsp_transcript_hash(true, 0, &message_k, None)?;
        debug!("!!! th1 : {:02x?}\n", th1.as_ref());

        let base_hash_sel = self.common.negotiate_info.base_hash_sel;
        let dhe_sel = self.common.negotiate_info.dhe_sel;
        let aead_sel = self.common.negotiate_info.aead_sel;
        let key_schedule_sel = self.common.negotiate_info.key_schedule_sel;
        let psk = self.common.config_info.psk;

        let session = self
            .common
            .get_next_avaiable_session()
            .ok_or_else(|| spdm_err!(DeviceError))?;
        session.setup(session_id)?;
        session.set_use_psk(true);
        session.heartbeat_period = heartbeat_period;
        session.set_crypto_param(base_hash_sel, dhe_sel, aead_sel, key_schedule_sel);
        session.set_dhe_secret(SpdmDheFinalKeyStruct::from_data(psk.as_ref()));
        session.generate_handshake_secret(&th1)?;
        let verify_data = session.generate_hmac_with_response_finished_key(th1.as_ref())?;
        send_buffer[used - base_hash_size..used].copy_from_slice(verify_data.as_ref());
        message_k
            .append_message(verify_data.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        session.runtime_info.message_k = message_k;
        session.set_session_state(SpdmSessionState::SpdmSessionHandshaking);

        self.send_message(&send_buffer[..used])
    }
}
