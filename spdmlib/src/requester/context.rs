// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::{
    SpdmConfigInfo, SpdmContext, SpdmDeviceIo, SpdmProvisionInfo, SpdmTransportEncap,
};
use crate::error::{SpdmErrorKind, SpdmResult};
use crate::message::{SpdmKeyUpdateOperation, SpdmMeasurementSummaryHashType};
use crate::time::sleep;
use crate::{config, spdm_err, spdm_result_err};

pub struct RequesterContext<'a> {
    pub common: SpdmContext<'a>,
}

impl<'a> RequesterContext<'a> {
    pub fn new(
        device_io: &'a mut dyn SpdmDeviceIo,
        transport_encap: &'a mut dyn SpdmTransportEncap,
        config_info: SpdmConfigInfo,
        provision_info: SpdmProvisionInfo,
    ) -> Self {
        RequesterContext {
            common: SpdmContext::new(device_io, transport_encap, config_info, provision_info),
        }
    }

    /// The VCA phase: GET_VERSION, GET_CAPABILITIES, NEGOTIATE_ALGORITHMS.
    pub fn init_connection(&mut self) -> SpdmResult {
        self.send_receive_spdm_version()?;
        self.send_receive_spdm_capability()?;
        self.send_receive_spdm_algorithm()
    }

    /// Establish a secure session; returns its id. The identity phase
    /// (digest/certificate, and challenge where supported) must have run
    /// for the asymmetric path.
    pub fn start_session(
        &mut self,
        use_psk: bool,
        slot_id: u8,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult<u32> {
        if !use_psk {
            let session_id =
                self.send_receive_spdm_key_exchange(slot_id, measurement_summary_hash_type)?;
            let mut_auth_requested = self
                .common
                .get_immutable_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?
                .mut_auth_requested;
            if mut_auth_requested {
                self.process_encapsulated_requests(Some(session_id))?;
            }
            self.send_receive_spdm_finish(session_id)?;
            Ok(session_id)
        } else {
            let session_id = self.send_receive_spdm_psk_exchange(measurement_summary_hash_type)?;
            self.send_receive_spdm_psk_finish(session_id)?;
            Ok(session_id)
        }
    }

    pub fn end_session(&mut self, session_id: u32) -> SpdmResult {
        self.send_receive_spdm_end_session(session_id)
    }

    /// Send one application payload in-session and hand back the peer's
    /// application reply.
    pub fn send_receive_spdm_app_message(
        &mut self,
        session_id: u32,
        request: &[u8],
        response: &mut [u8],
    ) -> SpdmResult<usize> {
        {
            let session = self
                .common
                .get_immutable_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            if session.get_session_state() != SpdmSessionState::SpdmSessionEstablished {
                return spdm_result_err!(SessionRequired);
            }
        }
        self.send_secured_message(session_id, request, true)?;
        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let (used, is_app_message) =
            self.receive_secured_message_ext(session_id, &mut receive_buffer)?;
        if !is_app_message {
            return spdm_result_err!(InvalidMessageField);
        }
        if response.len() < used {
            return spdm_result_err!(BufferTooSmall);
        }
        response[..used].copy_from_slice(&receive_buffer[..used]);
        Ok(used)
    }

    /// Retry loop for exchanges the peer may answer with ERROR(BUSY).
    pub(crate) fn with_retry<T>(
        &mut self,
        mut exchange: impl FnMut(&mut Self) -> SpdmResult<T>,
    ) -> SpdmResult<T> {
        let mut retry_left = self.common.config_info.max_retry_times;
        loop {
            match exchange(self) {
                Err(err) if err.kind == SpdmErrorKind::Busy && retry_left > 0 => {
                    retry_left -= 1;
                    sleep(config::ST1);
                }
                other => return other,
            }
        }
    }

    pub fn send_message(&mut self, send_buffer: &[u8]) -> SpdmResult {
        let mut transport_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let used = self.common.encap(send_buffer, &mut transport_buffer)?;
        self.common.device_io.send(&transport_buffer[..used])
    }

    pub fn receive_message(&mut self, receive_buffer: &mut [u8]) -> SpdmResult<usize> {
        let mut transport_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let used = self
            .common
            .device_io
            .receive(&mut transport_buffer, config::ST1)
            .map_err(|_| spdm_err!(DeviceError))?;
        let (used, secured_message) = self
            .common
            .decap(&transport_buffer[..used], receive_buffer)?;
        if secured_message {
            return spdm_result_err!(InvalidMessageField);
        }
        Ok(used)
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
            true,
            is_app_message,
        )?;
        self.common.device_io.send(&transport_buffer[..used])
    }

    pub fn receive_secured_message(
        &mut self,
        session_id: u32,
        receive_buffer: &mut [u8],
    ) -> SpdmResult<usize> {
        let (used, is_app_message) =
            self.receive_secured_message_ext(session_id, receive_buffer)?;
        if is_app_message {
            return spdm_result_err!(InvalidMessageField);
        }
        Ok(used)
    }

    pub fn receive_secured_message_ext(
        &mut self,
        session_id: u32,
        receive_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)> {
        let mut transport_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let used = self
            .common
            .device_io
            .receive(&mut transport_buffer, config::ST1)
            .map_err(|_| spdm_err!(DeviceError))?;
        let mut secured_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let (used, secured_message) = self
            .common
            .decap(&transport_buffer[..used], &mut secured_buffer)?;
        if !secured_message {
            return spdm_result_err!(InvalidMessageField);
        }
        self.common
            .decode_secured_message(session_id, &secured_buffer[..used], receive_buffer, false)
    }

    /// HEARTBEAT / KEY_UPDATE front doors, re-exported here so callers see
    /// one surface.
    pub fn heartbeat(&mut self, session_id: u32) -> SpdmResult {
        self.send_receive_spdm_heartbeat(session_id)
    }

    pub fn key_update(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
    ) -> SpdmResult {
        self.send_receive_spdm_key_update(session_id, key_update_operation)
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::message::SpdmMeasurementSummaryHashType;
    use crate::protocol::*;
    use crate::responder;
    use crate::testlib::*;

    #[test]
    fn test_case0_full_session_lifecycle() {
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

        let session_id = requester
            .start_session(
                false,
                0,
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
            )
            .unwrap();

        // application data echoes through the secure channel
        let payload = [0x41u8; 200];
        let mut response = [0u8; 256];
        let used = requester
            .send_receive_spdm_app_message(session_id, &payload, &mut response)
            .unwrap();
        assert_eq!(&response[..used], &payload[..]);

        assert!(requester.heartbeat(session_id).is_ok());

        assert!(requester
            .key_update(session_id, SpdmKeyUpdateOperation::SpdmUpdateKey)
            .is_ok());
        assert!(requester
            .key_update(session_id, SpdmKeyUpdateOperation::SpdmUpdateAllKeys)
            .is_ok());

        // traffic still flows on the rotated keys
        let used = requester
            .send_receive_spdm_app_message(session_id, &payload, &mut response)
            .unwrap();
        assert_eq!(&response[..used], &payload[..]);

        assert!(requester.end_session(session_id).is_ok());
        assert!(requester
            .common
            .get_immutable_session_via_id(session_id)
            .is_none());
    }

    #[test]
    fn test_case1_mutual_auth_session() {
        let (mut rsp_config_info, rsp_provision_info) = create_info();
        let (mut req_config_info, req_provision_info) = create_info();
        rsp_config_info.mut_auth_requested = true;
        rsp_config_info.rsp_capabilities |= SpdmResponseCapabilityFlags::MUT_AUTH_CAP;
        req_config_info.req_capabilities |= SpdmRequestCapabilityFlags::MUT_AUTH_CAP;

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

        let session_id = requester
            .start_session(
                false,
                0,
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
            )
            .unwrap();
        let session = requester
            .common
            .get_immutable_session_via_id(session_id)
            .unwrap();
        assert!(session.mut_auth_requested);
        assert_eq!(
            session.get_session_state(),
            crate::common::session::SpdmSessionState::SpdmSessionEstablished
        );

        // the requester's chain landed on the responder via the
        // encapsulated flow
        assert!(requester.common.peer_info.peer_cert_chain[0].is_some());
    }

    #[test]
    fn test_case2_requester_resets_on_resync_error() {
        let (req_config_info, req_provision_info) = create_info();
        let shared_buffer = SharedBuffer::new();
        let mut device_io = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut requester = RequesterContext::new(
            &mut device_io,
            transport_encap,
            req_config_info,
            req_provision_info,
        );
        requester
            .common
            .runtime_info
            .set_connection_state(crate::common::SpdmConnectionState::SpdmConnectionNegotiated);
        requester.common.negotiate_info.spdm_version_sel = SpdmVersion::SpdmVersion11;

        // a peer answering ERROR(REQUEST_RESYNCH) drops our state too
        let status = requester.spdm_handle_error_response_main(
            None,
            &[0x11, 0x7F, 0x43, 0x00],
            SpdmRequestResponseCode::SpdmRequestGetDigests,
            SpdmRequestResponseCode::SpdmResponseDigests,
        );
        assert!(status.is_err());
        assert_eq!(
            requester.common.runtime_info.get_connection_state(),
            crate::common::SpdmConnectionState::SpdmConnectionNotStarted
        );
    }

    #[test]
    fn test_case3_requester_surfaces_busy_for_retry() {
        let (req_config_info, req_provision_info) = create_info();
        let shared_buffer = SharedBuffer::new();
        let mut device_io = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut requester = RequesterContext::new(
            &mut device_io,
            transport_encap,
            req_config_info,
            req_provision_info,
        );
        requester.common.negotiate_info.spdm_version_sel = SpdmVersion::SpdmVersion11;

        let status = requester.spdm_handle_error_response_main(
            None,
            &[0x11, 0x7F, 0x03, 0x00],
            SpdmRequestResponseCode::SpdmRequestGetDigests,
            SpdmRequestResponseCode::SpdmResponseDigests,
        );
        match status {
            Err(err) => assert_eq!(err.kind, SpdmErrorKind::Busy),
            Ok(_) => panic!("busy must not produce a response"),
        }
    }
}
