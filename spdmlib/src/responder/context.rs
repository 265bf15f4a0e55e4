// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::{
    get_secured_message_session_id, SpdmConfigInfo, SpdmContext, SpdmDeviceIo, SpdmProvisionInfo,
    SpdmResponseState, SpdmTransportEncap,
};
use crate::error::SpdmResult;
use crate::message::{SpdmErrorCode, SpdmMessageHeader, SpdmRequestResponseCode};
use crate::{config, spdm_err, spdm_result_err};
use codec::{Codec, Reader};

pub struct ResponderContext<'a> {
    pub common: SpdmContext<'a>,
}

impl<'a> ResponderContext<'a> {
    pub fn new(
        device_io: &'a mut dyn SpdmDeviceIo,
        transport_encap: &'a mut dyn SpdmTransportEncap,
        config_info: SpdmConfigInfo,
        provision_info: SpdmProvisionInfo,
    ) -> Self {
        ResponderContext {
            common: SpdmContext::new(device_io, transport_encap, config_info, provision_info),
        }
    }

    pub fn send_message(&mut self, send_buffer: &[u8]) -> SpdmResult {
        let mut transport_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let used = self.common.encap(send_buffer, &mut transport_buffer)?;
        self.common.device_io.send(&transport_buffer[..used])
    }

    pub fn send_secured_message(
        &mut self,
        session_id: u32,
        send_buffer: &[u8],
        is_app_message: bool,
    ) -> SpdmResult {
        let mut transport_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let used = self.common.encode_secured_message(
            session_id,
            send_buffer,
            &mut transport_buffer,
            false,
            is_app_message,
        )?;
        self.common.device_io.send(&transport_buffer[..used])
    }

    /// Route a response through the channel the request came in on.
    pub fn send_response(&mut self, session_id: Option<u32>, send_buffer: &[u8]) -> SpdmResult {
        match session_id {
            Some(session_id) => self.send_secured_message(session_id, send_buffer, false),
            None => self.send_message(send_buffer),
        }
    }

    /// One round of dispatch: receive a request, answer it.
    pub fn process_message(&mut self, timeout: usize) -> SpdmResult {
        let mut transport_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let used = self
            .common
            .device_io
            .receive(&mut transport_buffer, timeout)
            .map_err(|_| spdm_err!(DeviceError))?;

        let mut spdm_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let (used, secured_message) = self
            .common
            .decap(&transport_buffer[..used], &mut spdm_buffer)?;

        if secured_message {
            let session_id = get_secured_message_session_id(&spdm_buffer[..used])?;
            let mut request = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let (request_used, is_app_message) = self.common.decode_secured_message(
                session_id,
                &spdm_buffer[..used],
                &mut request,
                true,
            )?;
            if is_app_message {
                self.dispatch_secured_app_message(session_id, &request[..request_used])
            } else {
                self.dispatch_secured_message(session_id, &request[..request_used])
            }
        } else {
            self.dispatch_message(&spdm_buffer[..used])
        }
    }

    pub fn dispatch_message(&mut self, bytes: &[u8]) -> SpdmResult {
        let mut reader = Reader::init(bytes);
        let header = match SpdmMessageHeader::read(&mut reader) {
            Some(header) => header,
            None => return spdm_result_err!(InvalidMessageField),
        };
        let request_code = header.request_response_code;

        if !self.response_state_allows(None, bytes, request_code)? {
            return Ok(());
        }

        match request_code {
            SpdmRequestResponseCode::SpdmRequestGetVersion => self.handle_spdm_version(bytes),
            SpdmRequestResponseCode::SpdmRequestGetCapabilities => {
                self.handle_spdm_capability(bytes)
            }
            SpdmRequestResponseCode::SpdmRequestNegotiateAlgorithms => {
                self.handle_spdm_algorithm(bytes)
            }
            SpdmRequestResponseCode::SpdmRequestGetDigests => self.handle_spdm_digest(bytes),
            SpdmRequestResponseCode::SpdmRequestGetCertificate => {
                self.handle_spdm_certificate(bytes)
            }
            SpdmRequestResponseCode::SpdmRequestChallenge => self.handle_spdm_challenge(bytes),
            SpdmRequestResponseCode::SpdmRequestGetMeasurements => {
                self.handle_spdm_measurement(None, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestKeyExchange => {
                self.handle_spdm_key_exchange(bytes)
            }
            SpdmRequestResponseCode::SpdmRequestPskExchange => {
                self.handle_spdm_psk_exchange(bytes)
            }
            SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest => {
                self.handle_get_encapsulated_request(None, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestDeliverEncapsulatedResponse => {
                self.handle_deliver_encapsulated_response(None, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestVendorDefinedRequest => {
                self.handle_spdm_vendor_defined_request(None, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestRespondIfReady => {
                self.handle_spdm_respond_if_ready(None, bytes)
            }
            // session-establishment follow-ups and traffic must arrive
            // inside the session
            SpdmRequestResponseCode::SpdmRequestFinish
            | SpdmRequestResponseCode::SpdmRequestPskFinish
            | SpdmRequestResponseCode::SpdmRequestHeartbeat
            | SpdmRequestResponseCode::SpdmRequestKeyUpdate
            | SpdmRequestResponseCode::SpdmRequestEndSession => self.send_spdm_error(
                None,
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            ),
            _ => self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnsupportedRequest, 0),
        }
    }

    pub fn dispatch_secured_message(&mut self, session_id: u32, bytes: &[u8]) -> SpdmResult {
        let mut reader = Reader::init(bytes);
        let header = match SpdmMessageHeader::read(&mut reader) {
            Some(header) => header,
            None => return spdm_result_err!(InvalidMessageField),
        };
        let request_code = header.request_response_code;

        if !self.response_state_allows(Some(session_id), bytes, request_code)? {
            return Ok(());
        }

        match request_code {
            SpdmRequestResponseCode::SpdmRequestFinish => {
                self.handle_spdm_finish(session_id, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestPskFinish => {
                self.handle_spdm_psk_finish(session_id, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestHeartbeat => {
                self.handle_spdm_heartbeat(session_id, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestKeyUpdate => {
                self.handle_spdm_key_update(session_id, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestEndSession => {
                self.handle_spdm_end_session(session_id, bytes)
            }
            SpdmRequestResponseCode::SpdmRequestGetMeasurements => {
                self.handle_spdm_measurement(Some(session_id), bytes)
            }
            SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest => {
                self.handle_get_encapsulated_request(Some(session_id), bytes)
            }
            SpdmRequestResponseCode::SpdmRequestDeliverEncapsulatedResponse => {
                self.handle_deliver_encapsulated_response(Some(session_id), bytes)
            }
            SpdmRequestResponseCode::SpdmRequestVendorDefinedRequest => {
                self.handle_spdm_vendor_defined_request(Some(session_id), bytes)
            }
            SpdmRequestResponseCode::SpdmRequestRespondIfReady => {
                self.handle_spdm_respond_if_ready(Some(session_id), bytes)
            }
            _ => self.send_spdm_error(
                Some(session_id),
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            ),
        }
    }

    /// Apply the response-state gate. `Ok(true)` means dispatch may
    /// proceed; `Ok(false)` means the gate already answered.
    fn response_state_allows(
        &mut self,
        session_id: Option<u32>,
        bytes: &[u8],
        request_code: SpdmRequestResponseCode,
    ) -> SpdmResult<bool> {
        let response_state = self.common.runtime_info.get_response_state();
        if response_state == SpdmResponseState::SpdmResponseStateNormal {
            return Ok(true);
        }
        let passes = match response_state {
            // a GET_VERSION completes the resynchronization
            SpdmResponseState::SpdmResponseStateNeedResync => {
                request_code == SpdmRequestResponseCode::SpdmRequestGetVersion
            }
            // the encapsulated exchange itself must flow
            SpdmResponseState::SpdmResponseStateProcessingEncap => {
                request_code == SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest
                    || request_code
                        == SpdmRequestResponseCode::SpdmRequestDeliverEncapsulatedResponse
            }
            _ => false,
        };
        if passes {
            return Ok(true);
        }
        self.handle_response_state(session_id, bytes, request_code)?;
        Ok(false)
    }
}
