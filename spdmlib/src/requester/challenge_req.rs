// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_challenge(
        &mut self,
        slot_id: u8,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult {
        self.with_retry(|requester| {
            requester.try_send_receive_spdm_challenge(slot_id, measurement_summary_hash_type)
        })
    }

    fn try_send_receive_spdm_challenge(
        &mut self,
        slot_id: u8,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult {
        info!("send spdm challenge\n");
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
            .rsp_capabilities_sel
            .contains(SpdmResponseCapabilityFlags::CHAL_CAP)
        {
            return spdm_result_err!(Unsupported);
        }

        self.common.runtime_info.need_measurement_summary_hash = measurement_summary_hash_type
            != SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone;

        let mut nonce = [0u8; SPDM_NONCE_SIZE];
        crypto::rand::get_random(&mut nonce)?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestChallenge,
            },
            payload: SpdmMessagePayload::SpdmChallengeRequest(SpdmChallengeRequestPayload {
                slot_id,
                measurement_summary_hash_type,
                nonce: SpdmNonceStruct { data: nonce },
            }),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_message(&send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_message(&mut receive_buffer)?;
        self.handle_spdm_challenge_response(
            slot_id,
            &send_buffer[..send_used],
            &receive_buffer[..receive_used],
        )
    }

    fn handle_spdm_challenge_response(
        &mut self,
        slot_id: u8,
        send_buffer: &[u8],
        receive_buffer: &[u8],
    ) -> SpdmResult {
        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.version != self.common.negotiate_info.spdm_version_sel {
                    return spdm_result_err!(InvalidMessageField);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseChallengeAuth => {
                        let challenge_auth = SpdmChallengeAuthResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        );
                        let used = reader.used();
                        if let Some(challenge_auth) = challenge_auth {
                            debug!("!!! challenge_auth rsp : {:02x?}\n", challenge_auth);

                            // the responder's view of its own chain must
                            // match what we reassembled
                            let peer_cert_chain = self.common.peer_info.peer_cert_chain
                                [slot_id as usize]
                                .as_ref()
                                .ok_or_else(|| spdm_err!(InvalidParameter))?;
                            let chain_hash = crypto::hash::hash_all(
                                self.common.negotiate_info.base_hash_sel,
                                peer_cert_chain.as_ref(),
                            )
                            .ok_or_else(|| spdm_err!(DeviceError))?;
                            if chain_hash.as_ref() != challenge_auth.cert_chain_hash.as_ref() {
                                error!("challenge_auth cert chain hash mismatch\n");
                                return spdm_result_err!(SecurityViolation);
                            }

                            let base_asym_size =
                                self.common.negotiate_info.base_asym_sel.get_size() as usize;
                            let marker = self.common.runtime_info.message_c.marker();
                            self.common.append_message_c(send_buffer)?;
                            self.common
                                .append_message_c(&receive_buffer[..used - base_asym_size])?;

                            if self
                                .verify_challenge_auth_signature(slot_id, &challenge_auth.signature)
                                .is_err()
                            {
                                error!("verify_challenge_auth_signature fail\n");
                                self.common.runtime_info.message_c.rollback(marker);
                                return spdm_result_err!(SecurityViolation);
                            }
                            info!("verify_challenge_auth_signature pass\n");
                            self.common
                                .append_message_c(challenge_auth.signature.as_ref())?;

                            self.common.runtime_info.set_connection_state(
                                SpdmConnectionState::SpdmConnectionAuthenticated,
                            );
                            Ok(())
                        } else {
                            error!("!!! challenge_auth : fail !!!\n");
                            spdm_result_err!(InvalidMessageField)
                        }
                    }
                    SpdmRequestResponseCode::SpdmResponseError => {
                        let received = self.spdm_handle_error_response_main(
                            None,
                            receive_buffer,
                            SpdmRequestResponseCode::SpdmRequestChallenge,
                            SpdmRequestResponseCode::SpdmResponseChallengeAuth,
                        )?;
                        self.handle_spdm_challenge_response(
                            slot_id,
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

    pub fn verify_challenge_auth_signature(
        &self,
        slot_id: u8,
        signature: &SpdmSignatureStruct,
    ) -> SpdmResult {
        let message_m1m2 = self.common.calc_m1m2()?;
        debug!("message_m1m2 size - {:?}\n", message_m1m2.data_size());

        let peer_cert_chain = self.common.peer_info.peer_cert_chain[slot_id as usize]
            .as_ref()
            .ok_or_else(|| spdm_err!(InvalidParameter))?;
        let hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;
        let cert_chain_data =
            &peer_cert_chain.data[4 + hash_size..peer_cert_chain.data_size as usize];

        crypto::asym_verify::verify(
            self.common.negotiate_info.base_hash_sel,
            self.common.negotiate_info.base_asym_sel,
            cert_chain_data,
            message_m1m2.as_ref(),
            signature,
        )
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::responder;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_challenge() {
        let (rsp_config_info, rsp_provision_info) = create_info();
        let (req_config_info, req_provision_info) = create_info();

        let shared_buffer = SharedBuffer::new();
        let mut device_io_responder = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = responder::ResponderContext::new(
            &mut device_io_responder,
            transport_encap,
            rsp_config_info,
            rsp_provision_info,
        );

        let transport_encap2 = &mut TestTransportEncap;
        let mut device_io_requester = FakeSpdmDeviceIo::new(&shared_buffer, &mut responder);

        let mut requester = RequesterContext::new(
            &mut device_io_requester,
            transport_encap2,
            req_config_info,
            req_provision_info,
        );

        assert!(requester.init_connection().is_ok());
        assert!(requester.send_receive_spdm_digest().is_ok());
        assert!(requester.send_receive_spdm_certificate(0).is_ok());
        assert!(requester
            .send_receive_spdm_challenge(
                0,
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone
            )
            .is_ok());
        assert_eq!(
            requester.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAuthenticated
        );
    }

    #[test]
    fn test_case1_tampered_transcript_fails_verification() {
        let (rsp_config_info, rsp_provision_info) = create_info();
        let (req_config_info, req_provision_info) = create_info();

        let shared_buffer = SharedBuffer::new();
        let mut device_io_responder = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = responder::ResponderContext::new(
            &mut device_io_responder,
            transport_encap,
            rsp_config_info,
            rsp_provision_info,
        );

        let transport_encap2 = &mut TestTransportEncap;
        let mut device_io_requester = FakeSpdmDeviceIo::new(&shared_buffer, &mut responder);

        let mut requester = RequesterContext::new(
            &mut device_io_requester,
            transport_encap2,
            req_config_info,
            req_provision_info,
        );

        assert!(requester.init_connection().is_ok());
        assert!(requester.send_receive_spdm_digest().is_ok());
        assert!(requester.send_receive_spdm_certificate(0).is_ok());

        // skew the requester's view of the negotiation transcript
        requester.common.append_message_a(&[0xde, 0xad]).unwrap();

        let status = requester.send_receive_spdm_challenge(
            0,
            SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
        );
        assert_eq!(status, spdm_result_err!(SecurityViolation));
        assert_ne!(
            requester.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAuthenticated
        );
    }
}
