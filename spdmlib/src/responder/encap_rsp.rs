// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Responder half of the encapsulated flow: hand out embedded requests
//! when polled, absorb the delivered responses, and collect the
//! requester's certificate chain for mutual authentication.

use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmEncapState, SpdmResponseState};
use crate::crypto;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> ResponderContext<'a> {
    pub fn handle_get_encapsulated_request(
        &mut self,
        session_id: Option<u32>,
        bytes: &[u8],
    ) -> SpdmResult {
        info!("got spdm get_encapsulated_request\n");
        if self.common.runtime_info.get_response_state()
            != SpdmResponseState::SpdmResponseStateProcessingEncap
        {
            return self.send_spdm_error(
                session_id,
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            );
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        if SpdmGetEncapsulatedRequestPayload::spdm_read(&mut self.common, &mut reader).is_none()
        {
            return self.send_spdm_error(
                session_id,
                SpdmErrorCode::SpdmErrorInvalidRequest,
                0,
            );
        }

        let request_id = self.common.encap_context.request_id;
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseEncapsulatedRequest,
            },
            payload: SpdmMessagePayload::SpdmEncapsulatedRequest(
                SpdmEncapsulatedRequestPayload { request_id },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        self.write_encap_request(&mut writer)?;
        let used = writer.used();
        self.send_response(session_id, &send_buffer[..used])
    }

    pub fn handle_deliver_encapsulated_response(
        &mut self,
        session_id: Option<u32>,
        bytes: &[u8],
    ) -> SpdmResult {
        info!("got spdm deliver_encapsulated_response\n");
        if self.common.runtime_info.get_response_state()
            != SpdmResponseState::SpdmResponseStateProcessingEncap
        {
            return self.send_spdm_error(
                session_id,
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            );
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let deliver = match SpdmDeliverEncapsulatedResponsePayload::spdm_read(
            &mut self.common,
            &mut reader,
        ) {
            Some(deliver) => deliver,
            None => {
                return self.send_spdm_error(
                    session_id,
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                )
            }
        };
        if deliver.request_id != self.common.encap_context.request_id {
            error!("encapsulated request_id mismatch\n");
            return self.send_spdm_error(session_id, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }
        let embedded = &bytes[reader.used()..];

        let done = match self.process_encap_response(embedded) {
            Ok(done) => done,
            Err(_) => {
                // abandon mutual auth; the FINISH check will reject if a
                // signature was mandatory
                self.common
                    .runtime_info
                    .set_response_state(SpdmResponseState::SpdmResponseStateNormal);
                return self.send_spdm_error(
                    session_id,
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                );
            }
        };

        let request_id = self.common.encap_context.request_id;
        let payload_type = if done {
            self.common
                .runtime_info
                .set_response_state(SpdmResponseState::SpdmResponseStateNormal);
            SpdmEncapsulatedResponseAckPayloadType::SpdmEncapsulatedResponseAckAbsent
        } else {
            SpdmEncapsulatedResponseAckPayloadType::SpdmEncapsulatedResponseAckPresent
        };

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code:
                    SpdmRequestResponseCode::SpdmResponseEncapsulatedResponseAck,
            },
            payload: SpdmMessagePayload::SpdmEncapsulatedResponseAck(
                SpdmEncapsulatedResponseAckPayload {
                    request_id,
                    payload_type,
                },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        if !done {
            self.write_encap_request(&mut writer)?;
        }
        let used = writer.used();
        self.send_response(session_id, &send_buffer[..used])
    }

    /// Append the embedded request matching the current encap state.
    fn write_encap_request(&mut self, writer: &mut Writer) -> SpdmResult {
        match self.common.encap_context.encap_state {
            SpdmEncapState::SpdmEncapGetDigest => {
                let request = SpdmMessage {
                    header: SpdmMessageHeader {
                        version: self.common.negotiate_info.spdm_version_sel,
                        request_response_code: SpdmRequestResponseCode::SpdmRequestGetDigests,
                    },
                    payload: SpdmMessagePayload::SpdmGetDigestsRequest(
                        SpdmGetDigestsRequestPayload {},
                    ),
                };
                request.spdm_encode(&mut self.common, writer);
                Ok(())
            }
            SpdmEncapState::SpdmEncapGetCertificate => {
                let request = SpdmMessage {
                    header: SpdmMessageHeader {
                        version: self.common.negotiate_info.spdm_version_sel,
                        request_response_code: SpdmRequestResponseCode::SpdmRequestGetCertificate,
                    },
                    payload: SpdmMessagePayload::SpdmGetCertificateRequest(
                        SpdmGetCertificateRequestPayload {
                            slot_id: self.common.encap_context.req_slot_id,
                            offset: self.common.encap_context.cert_chain_offset,
                            length: config::MAX_SPDM_CERT_PORTION_LEN as u16,
                        },
                    ),
                };
                request.spdm_encode(&mut self.common, writer);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Absorb one delivered response; `Ok(true)` ends the flow.
    fn process_encap_response(&mut self, embedded: &[u8]) -> SpdmResult<bool> {
        let mut reader = Reader::init(embedded);
        let header =
            SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        match header.request_response_code {
            SpdmRequestResponseCode::SpdmResponseDigests => {
                let digests =
                    SpdmDigestsResponsePayload::spdm_read(&mut self.common, &mut reader)
                        .ok_or_else(|| spdm_err!(InvalidMessageField))?;
                if digests.slot_mask == 0 {
                    return spdm_result_err!(InvalidMessageField);
                }
                let slot = digests.slot_mask.trailing_zeros() as u8;
                self.common.encap_context.req_slot_id = slot;
                self.common.encap_context.peer_digest = Some(digests.digests[0]);
                self.common.encap_context.cert_chain_offset = 0;
                self.common.encap_context.peer_cert_chain_temp = SpdmCertChainData::default();
                self.common.encap_context.encap_state = SpdmEncapState::SpdmEncapGetCertificate;
                Ok(false)
            }
            SpdmRequestResponseCode::SpdmResponseCertificate => {
                let certificate =
                    SpdmCertificateResponsePayload::spdm_read(&mut self.common, &mut reader)
                        .ok_or_else(|| spdm_err!(InvalidMessageField))?;
                let offset = self.common.encap_context.cert_chain_offset as usize;
                let portion = certificate.portion_length as usize;
                let chain = &mut self.common.encap_context.peer_cert_chain_temp;
                if offset + portion > chain.data.len() {
                    return spdm_result_err!(InvalidMessageField);
                }
                chain.data[offset..offset + portion]
                    .copy_from_slice(&certificate.cert_chain[..portion]);
                chain.data_size = (offset + portion) as u16;
                self.common.encap_context.cert_chain_offset = chain.data_size;

                if certificate.remainder_length > 0 {
                    return Ok(false);
                }
                self.finish_encap_cert_chain()?;
                self.common.encap_context.encap_state = SpdmEncapState::SpdmEncapComplete;
                Ok(true)
            }
            _ => spdm_result_err!(InvalidMessageField),
        }
    }

    /// The collected bytes are the wire-format chain; check them against
    /// the announced digest and chain signatures, then retain them as the
    /// requester's identity.
    fn finish_encap_cert_chain(&mut self) -> SpdmResult {
        let base_hash_sel = self.common.negotiate_info.base_hash_sel;
        let hash_size = base_hash_sel.get_size() as usize;
        let collected = self.common.encap_context.peer_cert_chain_temp;
        if (collected.data_size as usize) < 4 + hash_size {
            return spdm_result_err!(InvalidMessageField);
        }

        let chain_digest = crypto::hash::hash_all(base_hash_sel, collected.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))?;
        match &self.common.encap_context.peer_digest {
            Some(expected) if expected.as_ref() == chain_digest.as_ref() => {}
            _ => {
                error!("encap cert chain digest mismatch\n");
                return spdm_result_err!(SecurityViolation);
            }
        }

        let cert_chain_der = &collected.data[4 + hash_size..collected.data_size as usize];
        crypto::cert_operation::verify_cert_chain(cert_chain_der)?;

        let mut buffer = SpdmCertChainBuffer::default();
        buffer.data[..collected.data_size as usize]
            .copy_from_slice(&collected.data[..collected.data_size as usize]);
        buffer.data_size = collected.data_size;
        let slot = self.common.encap_context.req_slot_id as usize;
        self.common.peer_info.peer_cert_chain[slot] = Some(buffer);
        info!("encap cert chain accepted\n");
        Ok(())
    }
}
