// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::error::SpdmResult;
use crate::message::*;
use crate::requester::{ReceivedMessage, RequesterContext};
use crate::time::sleep;
use crate::{config, spdm_result_err};
use codec::{Codec, Reader, Writer};

impl<'a> RequesterContext<'a> {
    fn spdm_handle_response_not_ready(
        &mut self,
        session_id: Option<u32>,
        extend_error_data: SpdmErrorResponseNotReadyExtData,
        original_request_code: SpdmRequestResponseCode,
        expected_response_code: SpdmRequestResponseCode,
    ) -> SpdmResult<ReceivedMessage> {
        if extend_error_data.request_code != original_request_code.get_u8() {
            return spdm_result_err!(InvalidMessageField);
        }
        sleep((extend_error_data.rdtm as usize) << extend_error_data.rdt_exponent);
        self.spdm_requester_respond_if_ready(session_id, expected_response_code, extend_error_data)
    }

    fn spdm_requester_respond_if_ready(
        &mut self,
        session_id: Option<u32>,
        expected_response_code: SpdmRequestResponseCode,
        extend_error_data: SpdmErrorResponseNotReadyExtData,
    ) -> SpdmResult<ReceivedMessage> {
        info!("send spdm respond_if_ready\n");
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestRespondIfReady,
            },
            payload: SpdmMessagePayload::SpdmRespondIfReadyRequest(
                SpdmRespondIfReadyRequestPayload {
                    request_code: extend_error_data.request_code,
                    token: extend_error_data.token,
                },
            ),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();

        let mut received = ReceivedMessage::default();
        match session_id {
            Some(session_id) => {
                self.send_secured_message(session_id, &send_buffer[..send_used], false)?;
                received.used =
                    self.receive_secured_message(session_id, &mut received.receive_buffer)?;
            }
            None => {
                self.send_message(&send_buffer[..send_used])?;
                received.used = self.receive_message(&mut received.receive_buffer)?;
            }
        }

        let mut reader = Reader::init(received.as_ref());
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.request_response_code != expected_response_code {
                    return spdm_result_err!(InvalidMessageField);
                }
                Ok(received)
            }
            None => spdm_result_err!(InvalidMessageField),
        }
    }

    fn spdm_handle_simple_error_response(
        &mut self,
        _session_id: Option<u32>,
        error_code: SpdmErrorCode,
    ) -> SpdmResult<ReceivedMessage> {
        match error_code {
            SpdmErrorCode::SpdmErrorBusy => spdm_result_err!(Busy),
            SpdmErrorCode::SpdmErrorRequestResynch => {
                // peer lost state: drop ours too and let the caller decide
                // whether to renegotiate
                self.common.reset_context();
                spdm_result_err!(DeviceError)
            }
            SpdmErrorCode::SpdmErrorUnsupportedRequest
            | SpdmErrorCode::SpdmErrorMajorVersionMismatch => spdm_result_err!(Unsupported),
            _ => spdm_result_err!(SecurityViolation),
        }
    }

    pub fn spdm_handle_error_response_main(
        &mut self,
        session_id: Option<u32>,
        response: &[u8],
        original_request_code: SpdmRequestResponseCode,
        expected_response_code: SpdmRequestResponseCode,
    ) -> SpdmResult<ReceivedMessage> {
        let mut reader = Reader::init(response);
        let header = match SpdmMessageHeader::read(&mut reader) {
            Some(header) => header,
            None => return spdm_result_err!(InvalidMessageField),
        };
        if header.request_response_code != SpdmRequestResponseCode::SpdmResponseError {
            return spdm_result_err!(InvalidMessageField);
        }
        let error_payload =
            match SpdmErrorResponsePayload::spdm_read(&mut self.common, &mut reader) {
                Some(payload) => payload,
                None => return spdm_result_err!(InvalidMessageField),
            };

        match error_payload.error_code {
            SpdmErrorCode::SpdmErrorDecryptError => {
                if let Some(session_id) = session_id {
                    self.common.remove_session_via_id(session_id);
                }
                spdm_result_err!(SecurityViolation)
            }
            SpdmErrorCode::SpdmErrorResponseNotReady => {
                let extend_error_data = match error_payload.extended_data {
                    SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(ext_data) => ext_data,
                    _ => return spdm_result_err!(InvalidMessageField),
                };
                self.spdm_handle_response_not_ready(
                    session_id,
                    extend_error_data,
                    original_request_code,
                    expected_response_code,
                )
            }
            other => self.spdm_handle_simple_error_response(session_id, other),
        }
    }
}
