// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Requester half of the encapsulated flow: poll the responder for
//! embedded requests, answer them from local state, and deliver the
//! replies. Only one nesting level exists; an encapsulated
//! GET_ENCAPSULATED_REQUEST is answered with an embedded ERROR.

use crate::common::spdm_codec::SpdmCodec;
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    pub fn process_encapsulated_requests(&mut self, session_id: Option<u32>) -> SpdmResult {
        info!("send spdm get_encapsulated_request\n");
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest,
            },
            payload: SpdmMessagePayload::SpdmGetEncapsulatedRequest(
                SpdmGetEncapsulatedRequestPayload {},
            ),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_request(session_id, &send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_response(session_id, &mut receive_buffer)?;

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        let header =
            SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        if header.request_response_code
            != SpdmRequestResponseCode::SpdmResponseEncapsulatedRequest
        {
            return spdm_result_err!(InvalidMessageField);
        }
        let encap_request = SpdmEncapsulatedRequestPayload::spdm_read(&mut self.common, &mut reader)
            .ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let mut request_id = encap_request.request_id;
        let embedded_offset = reader.used();
        if embedded_offset >= receive_used {
            // nothing pending on the responder side
            return Ok(());
        }
        let mut embedded = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut embedded_used = receive_used - embedded_offset;
        embedded[..embedded_used]
            .copy_from_slice(&receive_buffer[embedded_offset..receive_used]);

        for _ in 0..config::MAX_ENCAP_ROUNDS {
            let mut response = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let response_used =
                self.process_encap_request(&embedded[..embedded_used], &mut response)?;

            let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let mut writer = Writer::init(&mut send_buffer);
            let deliver = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code:
                        SpdmRequestResponseCode::SpdmRequestDeliverEncapsulatedResponse,
                },
                payload: SpdmMessagePayload::SpdmDeliverEncapsulatedResponse(
                    SpdmDeliverEncapsulatedResponsePayload { request_id },
                ),
            };
            deliver.spdm_encode(&mut self.common, &mut writer);
            assert!(writer
                .extend_from_slice(&response[..response_used])
                .is_some());
            let send_used = writer.used();
            self.send_request(session_id, &send_buffer[..send_used])?;

            let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let receive_used = self.receive_response(session_id, &mut receive_buffer)?;
            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader)
                .ok_or_else(|| spdm_err!(InvalidMessageField))?;
            if header.request_response_code
                != SpdmRequestResponseCode::SpdmResponseEncapsulatedResponseAck
            {
                return spdm_result_err!(InvalidMessageField);
            }
            let ack =
                SpdmEncapsulatedResponseAckPayload::spdm_read(&mut self.common, &mut reader)
                    .ok_or_else(|| spdm_err!(InvalidMessageField))?;
            if ack.request_id != request_id {
                error!("encapsulated request_id mismatch\n");
                return spdm_result_err!(InvalidMessageField);
            }
            match ack.payload_type {
                SpdmEncapsulatedResponseAckPayloadType::SpdmEncapsulatedResponseAckAbsent => {
                    return Ok(());
                }
                SpdmEncapsulatedResponseAckPayloadType::SpdmEncapsulatedResponseAckPresent => {
                    let embedded_offset = reader.used();
                    if embedded_offset >= receive_used {
                        return spdm_result_err!(InvalidMessageField);
                    }
                    embedded_used = receive_used - embedded_offset;
                    embedded[..embedded_used]
                        .copy_from_slice(&receive_buffer[embedded_offset..receive_used]);
                    request_id = ack.request_id;
                }
                _ => return spdm_result_err!(InvalidMessageField),
            }
        }
        error!("encapsulated flow never terminated\n");
        spdm_result_err!(DeviceError)
    }

    fn send_request(&mut self, session_id: Option<u32>, send_buffer: &[u8]) -> SpdmResult {
        match session_id {
            Some(session_id) => self.send_secured_message(session_id, send_buffer, false),
            None => self.send_message(send_buffer),
        }
    }

    fn receive_response(
        &mut self,
        session_id: Option<u32>,
        receive_buffer: &mut [u8],
    ) -> SpdmResult<usize> {
        match session_id {
            Some(session_id) => self.receive_secured_message(session_id, receive_buffer),
            None => self.receive_message(receive_buffer),
        }
    }

    /// Dispatch one embedded request against local state.
    fn process_encap_request(
        &mut self,
        encap_request: &[u8],
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let mut reader = Reader::init(encap_request);
        let header =
            SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        match header.request_response_code {
            SpdmRequestResponseCode::SpdmRequestGetDigests => {
                self.encap_handle_get_digests(encap_response)
            }
            SpdmRequestResponseCode::SpdmRequestGetCertificate => {
                self.encap_handle_get_certificate(&mut reader, encap_response)
            }
            SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest => {
                // no encap-within-encap
                self.encap_write_error(SpdmErrorCode::SpdmErrorInvalidRequest, encap_response)
            }
            _ => self.encap_write_error(
                SpdmErrorCode::SpdmErrorUnsupportedRequest,
                encap_response,
            ),
        }
    }

    fn encap_handle_get_digests(&mut self, encap_response: &mut [u8]) -> SpdmResult<usize> {
        let mut slot_mask = 0u8;
        let mut digests = [SpdmDigestStruct::default(); config::SPDM_MAX_SLOT_NUMBER];
        let mut digest_count = 0usize;
        for slot in 0..config::SPDM_MAX_SLOT_NUMBER {
            if let Some(cert_chain) = &self.common.provision_info.my_cert_chain[slot] {
                slot_mask |= 1 << slot;
                digests[digest_count] = crypto::hash::hash_all(
                    self.common.negotiate_info.base_hash_sel,
                    cert_chain.as_ref(),
                )
                .ok_or_else(|| spdm_err!(DeviceError))?;
                digest_count += 1;
            }
        }

        let mut writer = Writer::init(encap_response);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseDigests,
            },
            payload: SpdmMessagePayload::SpdmDigestsResponse(SpdmDigestsResponsePayload {
                slot_mask,
                digests,
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        Ok(writer.used())
    }

    fn encap_handle_get_certificate(
        &mut self,
        reader: &mut Reader,
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let get_certificate =
            SpdmGetCertificateRequestPayload::spdm_read(&mut self.common, reader)
                .ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let slot_id = get_certificate.slot_id;
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER {
            return self.encap_write_error(SpdmErrorCode::SpdmErrorInvalidRequest, encap_response);
        }
        let cert_chain = match &self.common.provision_info.my_cert_chain[slot_id as usize] {
            Some(cert_chain) => *cert_chain,
            None => {
                return self
                    .encap_write_error(SpdmErrorCode::SpdmErrorInvalidRequest, encap_response)
            }
        };

        let offset = get_certificate.offset as usize;
        if offset >= cert_chain.data_size as usize {
            return self.encap_write_error(SpdmErrorCode::SpdmErrorInvalidRequest, encap_response);
        }
        let length = (get_certificate.length as usize)
            .min(config::MAX_SPDM_CERT_PORTION_LEN)
            .min(cert_chain.data_size as usize - offset);
        let remainder = cert_chain.data_size as usize - offset - length;

        let mut payload = SpdmCertificateResponsePayload {
            slot_id,
            portion_length: length as u16,
            remainder_length: remainder as u16,
            ..Default::default()
        };
        payload.cert_chain[..length]
            .copy_from_slice(&cert_chain.data[offset..offset + length]);

        let mut writer = Writer::init(encap_response);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseCertificate,
            },
            payload: SpdmMessagePayload::SpdmCertificateResponse(payload),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        Ok(writer.used())
    }

    fn encap_write_error(
        &mut self,
        error_code: SpdmErrorCode,
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let mut writer = Writer::init(encap_response);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseError,
            },
            payload: SpdmMessagePayload::SpdmErrorResponse(SpdmErrorResponsePayload {
                error_code,
                error_data: 0,
                extended_data: SpdmErrorResponseExtData::default(),
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        Ok(writer.used())
    }
}
