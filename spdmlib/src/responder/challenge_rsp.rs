// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmConnectionState, SpdmOpaqueStruct};
use crate::crypto;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::secret;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_challenge(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm challenge\n");
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnexpectedRequest, 0);
        }
        if !self
            .common
            .negotiate_info
            .rsp_capabilities_sel
            .contains(SpdmResponseCapabilityFlags::CHAL_CAP)
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnsupportedRequest, 0);
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let challenge = match SpdmChallengeRequestPayload::spdm_read(&mut self.common, &mut reader)
        {
            Some(challenge) => challenge,
            None => {
                return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0)
            }
        };
        debug!("!!! challenge : {:02x?}\n", challenge);

        let slot_id = challenge.slot_id;
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }
        let cert_chain = match &self.common.provision_info.my_cert_chain[slot_id as usize] {
            Some(cert_chain) => *cert_chain,
            None => {
                return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0)
            }
        };

        self.common.runtime_info.need_measurement_summary_hash = challenge
            .measurement_summary_hash_type
            != SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone;

        let cert_chain_hash = crypto::hash::hash_all(
            self.common.negotiate_info.base_hash_sel,
            cert_chain.as_ref(),
        )
        .ok_or_else(|| spdm_err!(DeviceError))?;

        let measurement_summary_hash = if self.common.runtime_info.need_measurement_summary_hash {
            match secret::measurement::generate_measurement_summary_hash(
                self.common.negotiate_info.spdm_version_sel,
                self.common.negotiate_info.base_hash_sel,
                self.common.negotiate_info.measurement_specification_sel,
                self.common.negotiate_info.measurement_hash_sel,
                challenge.measurement_summary_hash_type.get_u8(),
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

        let mut nonce = [0u8; SPDM_NONCE_SIZE];
        crypto::rand::get_random(&mut nonce)?;

        let mut slot_mask = 0u8;
        for slot in 0..config::SPDM_MAX_SLOT_NUMBER {
            if self.common.provision_info.my_cert_chain[slot].is_some() {
                slot_mask |= 1 << slot;
            }
        }

        let base_asym_size = self.common.negotiate_info.base_asym_sel.get_size() as usize;
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseChallengeAuth,
            },
            payload: SpdmMessagePayload::SpdmChallengeAuthResponse(
                SpdmChallengeAuthResponsePayload {
                    slot_id,
                    slot_mask,
                    challenge_auth_attribute: SpdmChallengeAuthAttribute::empty(),
                    cert_chain_hash,
                    nonce: SpdmNonceStruct { data: nonce },
                    measurement_summary_hash,
                    opaque: SpdmOpaqueStruct::default(),
                    signature: SpdmSignatureStruct {
                        data_size: base_asym_size as u16,
                        ..Default::default()
                    },
                },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        // sign M1: everything up to, but not including, this signature
        let marker = self.common.runtime_info.message_c.marker();
        self.common.append_message_c(bytes)?;
        self.common
            .append_message_c(&send_buffer[..used - base_asym_size])?;
        let message_m1m2 = self.common.calc_m1m2()?;
        let signature = match crypto::asym_sign::sign(
            self.common.negotiate_info.base_hash_sel,
            self.common.negotiate_info.base_asym_sel,
            message_m1m2.as_ref(),
        ) {
            Some(signature) => signature,
            None => {
                error!("challenge_auth signing fail\n");
                self.common.runtime_info.message_c.rollback(marker);
                return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnspecified, 0);
            }
        };
        send_buffer[used - base_asym_size..used].copy_from_slice(signature.as_ref());
        self.common.append_message_c(signature.as_ref())?;

        self.common
            .runtime_info
            .set_connection_state(SpdmConnectionState::SpdmConnectionAuthenticated);

        self.send_message(&send_buffer[..used])
    }
}
