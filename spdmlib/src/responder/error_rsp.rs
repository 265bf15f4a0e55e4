// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! ERROR building plus the abnormal-response-state machinery: BUSY,
//! resynchronization, deferred replies with token bookkeeping, and the
//! RESPOND_IF_READY replay path.

use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmConnectionState, SpdmResponseState};
use crate::error::SpdmResult;
use crate::responder::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> ResponderContext<'a> {
    pub fn write_spdm_error(
        &mut self,
        error_code: SpdmErrorCode,
        error_data: u8,
        writer: &mut Writer,
    ) {
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseError,
            },
            payload: SpdmMessagePayload::SpdmErrorResponse(SpdmErrorResponsePayload {
                error_code,
                error_data,
                extended_data: SpdmErrorResponseExtData::SpdmErrorExtDataNone(
                    SpdmErrorResponseNoneExtData {},
                ),
            }),
        };
        response.spdm_encode(&mut self.common, writer);
    }

    pub fn send_spdm_error(
        &mut self,
        session_id: Option<u32>,
        error_code: SpdmErrorCode,
        error_data: u8,
    ) -> SpdmResult {
        info!("send spdm error {:02x}\n", error_code.get_u8());
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        self.write_spdm_error(error_code, error_data, &mut writer);
        let used = writer.used();
        self.send_response(session_id, &send_buffer[..used])
    }

    fn send_spdm_not_ready_error(
        &mut self,
        session_id: Option<u32>,
        extended_data: SpdmErrorResponseNotReadyExtData,
    ) -> SpdmResult {
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseError,
            },
            payload: SpdmMessagePayload::SpdmErrorResponse(SpdmErrorResponsePayload {
                error_code: SpdmErrorCode::SpdmErrorResponseNotReady,
                error_data: 0,
                extended_data: SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(extended_data),
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();
        self.send_response(session_id, &send_buffer[..used])
    }

    /// Answer a request while the response state is abnormal.
    pub fn handle_response_state(
        &mut self,
        session_id: Option<u32>,
        bytes: &[u8],
        request_code: SpdmRequestResponseCode,
    ) -> SpdmResult {
        match self.common.runtime_info.get_response_state() {
            SpdmResponseState::SpdmResponseStateBusy => {
                // the embedder clears Busy, not the protocol
                self.send_spdm_error(session_id, SpdmErrorCode::SpdmErrorBusy, 0)
            }
            SpdmResponseState::SpdmResponseStateNeedResync => {
                self.common
                    .runtime_info
                    .set_connection_state(SpdmConnectionState::SpdmConnectionNotStarted);
                self.send_spdm_error(session_id, SpdmErrorCode::SpdmErrorRequestResynch, 0)
            }
            SpdmResponseState::SpdmResponseStateNotReady => {
                // keep the recorded error_data while an earlier deferred
                // request is still pending
                if request_code != SpdmRequestResponseCode::SpdmRequestRespondIfReady {
                    if bytes.len() > config::MAX_SPDM_MESSAGE_BUFFER_SIZE {
                        return spdm_result_err!(InvalidMessageField);
                    }
                    self.common.runtime_info.cache_spdm_request[..bytes.len()]
                        .copy_from_slice(bytes);
                    self.common.runtime_info.cache_spdm_request_size = bytes.len();
                    let token = self.common.runtime_info.current_token;
                    self.common.runtime_info.error_data =
                        Some(SpdmErrorResponseNotReadyExtData {
                            rdt_exponent: 1,
                            request_code: request_code.get_u8(),
                            token,
                            rdtm: 1,
                        });
                    self.common.runtime_info.current_token = token.wrapping_add(1);
                }
                let extended_data = self
                    .common
                    .runtime_info
                    .error_data
                    .ok_or_else(|| spdm_err!(DeviceError))?;
                self.send_spdm_not_ready_error(session_id, extended_data)
            }
            SpdmResponseState::SpdmResponseStateProcessingEncap => {
                self.send_spdm_error(session_id, SpdmErrorCode::SpdmErrorRequestInFlight, 0)
            }
            SpdmResponseState::SpdmResponseStateNormal => Ok(()),
        }
    }

    /// A matching RESPOND_IF_READY replays the cached request through the
    /// normal dispatch; anything else is rejected without touching the
    /// cache.
    pub fn handle_spdm_respond_if_ready(
        &mut self,
        session_id: Option<u32>,
        bytes: &[u8],
    ) -> SpdmResult {
        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let respond_if_ready =
            SpdmRespondIfReadyRequestPayload::spdm_read(&mut self.common, &mut reader)
                .ok_or_else(|| spdm_err!(InvalidMessageField))?;
        debug!("!!! respond_if_ready : {:02x?}\n", respond_if_ready);

        let error_data = match self.common.runtime_info.error_data {
            Some(error_data) => error_data,
            None => {
                return self.send_spdm_error(
                    session_id,
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                )
            }
        };
        if respond_if_ready.token != error_data.token
            || respond_if_ready.request_code != error_data.request_code
        {
            return self.send_spdm_error(session_id, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }

        let cached_size = self.common.runtime_info.cache_spdm_request_size;
        if cached_size == 0 {
            return self.send_spdm_error(session_id, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }
        let mut cached_request = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        cached_request[..cached_size]
            .copy_from_slice(&self.common.runtime_info.cache_spdm_request[..cached_size]);
        self.common.runtime_info.error_data = None;
        self.common.runtime_info.cache_spdm_request_size = 0;

        match session_id {
            Some(session_id) => {
                self.dispatch_secured_message(session_id, &cached_request[..cached_size])
            }
            None => self.dispatch_message(&cached_request[..cached_size]),
        }
    }
}

#[cfg(test)]
mod tests_responder {
    use super::*;
    use crate::common::SpdmResponseState;
    use crate::testlib::*;

    fn run_negotiation(responder: &mut ResponderContext, shared_buffer: &SharedBuffer) {
        let mut response = [0u8; 256];
        responder.handle_spdm_version(&[0x10, 0x84, 0, 0]).unwrap();
        shared_buffer.drain(&mut response);
        responder
            .handle_spdm_capability(&[
                0x11, 0xE1, 0, 0, 0, 0, 0, 0, 0xC6, 0x76, 0, 0,
            ])
            .unwrap();
        shared_buffer.drain(&mut response);
        responder
            .handle_spdm_algorithm(&[
                0x11, 0xE3, 4, 0, 48, 0, 1, 0, 0x80, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0x20, 0x10, 0, 3, 0x20, 2, 0, 4, 0x20, 0x80, 0, 5,
                0x20, 1, 0,
            ])
            .unwrap();
        shared_buffer.drain(&mut response);
    }

    #[test]
    fn test_case0_not_ready_token_and_replay() {
        let (config_info, provision_info) = create_info();
        let shared_buffer = SharedBuffer::new();
        let mut device_io = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = ResponderContext::new(
            &mut device_io,
            transport_encap,
            config_info,
            provision_info,
        );
        run_negotiation(&mut responder, &shared_buffer);
        let mut response = [0u8; 256];

        responder
            .common
            .runtime_info
            .set_response_state(SpdmResponseState::SpdmResponseStateNotReady);

        // a request while NotReady defers and burns one token
        responder
            .dispatch_message(&[0x11, 0x81, 0, 0])
            .unwrap();
        let used = shared_buffer.drain(&mut response);
        // transport header + ERROR(ResponseNotReady) + extended payload
        assert_eq!(response[2], 0x7F);
        assert_eq!(response[3], 0x42);
        let token = response[7];
        assert_eq!(used, 1 + 8);

        // RESPOND_IF_READY while still NotReady replays the same token
        responder
            .dispatch_message(&[0x11, 0xFF, 0x81, token])
            .unwrap();
        shared_buffer.drain(&mut response);
        assert_eq!(response[3], 0x42);
        assert_eq!(response[7], token);

        // next deferred request gets the next token (mod 256)
        responder
            .dispatch_message(&[0x11, 0x81, 0, 0])
            .unwrap();
        shared_buffer.drain(&mut response);
        assert_eq!(response[7], token.wrapping_add(1));

        // back to normal: a wrong token must not consume the cache
        responder
            .common
            .runtime_info
            .set_response_state(SpdmResponseState::SpdmResponseStateNormal);
        responder
            .dispatch_message(&[0x11, 0xFF, 0x81, token.wrapping_add(5)])
            .unwrap();
        shared_buffer.drain(&mut response);
        assert_eq!(response[2], 0x7F);
        assert_eq!(response[3], 0x01); // InvalidRequest
        assert!(responder.common.runtime_info.error_data.is_some());

        // the matching token replays the cached GET_DIGESTS
        responder
            .dispatch_message(&[0x11, 0xFF, 0x81, token.wrapping_add(1)])
            .unwrap();
        shared_buffer.drain(&mut response);
        assert_eq!(response[2], 0x01); // DIGESTS
        assert!(responder.common.runtime_info.error_data.is_none());
    }

    #[test]
    fn test_case1_busy_and_resync_states() {
        let (config_info, provision_info) = create_info();
        let shared_buffer = SharedBuffer::new();
        let mut device_io = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = ResponderContext::new(
            &mut device_io,
            transport_encap,
            config_info,
            provision_info,
        );
        run_negotiation(&mut responder, &shared_buffer);
        let mut response = [0u8; 256];

        responder
            .common
            .runtime_info
            .set_response_state(SpdmResponseState::SpdmResponseStateBusy);
        responder.dispatch_message(&[0x11, 0x81, 0, 0]).unwrap();
        shared_buffer.drain(&mut response);
        assert_eq!(response[3], 0x03); // Busy
        assert_eq!(
            responder.common.runtime_info.get_response_state(),
            SpdmResponseState::SpdmResponseStateBusy
        );

        responder
            .common
            .runtime_info
            .set_response_state(SpdmResponseState::SpdmResponseStateNeedResync);
        responder.dispatch_message(&[0x11, 0x81, 0, 0]).unwrap();
        shared_buffer.drain(&mut response);
        assert_eq!(response[3], 0x43); // RequestResynch
        assert_eq!(
            responder.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionNotStarted
        );

        // GET_VERSION passes the gate and completes the resync
        responder.dispatch_message(&[0x10, 0x84, 0, 0]).unwrap();
        shared_buffer.drain(&mut response);
        assert_eq!(response[2], 0x04); // VERSION
        assert_eq!(
            responder.common.runtime_info.get_response_state(),
            SpdmResponseState::SpdmResponseStateNormal
        );
    }
}
