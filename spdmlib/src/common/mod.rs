// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

pub mod key_schedule;
pub mod opaque;
pub mod session;
pub mod spdm_codec;
pub mod transcript;

pub use crate::error;
pub use opaque::SpdmOpaqueStruct;
pub use spdm_codec::SpdmCodec;
pub use transcript::*;

use crate::config;
use crate::error::SpdmResult;
use crate::message::SpdmErrorResponseNotReadyExtData;
use crate::protocol::*;
use crate::{spdm_err, spdm_result_err};
use session::{SpdmSession, INVALID_SESSION_ID};
use zeroize::Zeroize;

/// Raw message mover. Implementations deliver whole messages and block up
/// to `timeout` microseconds on receive; the error value of `receive` is
/// the number of bytes consumed before the failure.
pub trait SpdmDeviceIo {
    fn send(&mut self, buffer: &[u8]) -> SpdmResult;
    fn receive(&mut self, buffer: &mut [u8], timeout: usize) -> Result<usize, usize>;
}

/// Transport framing around SPDM messages: an outer header selecting
/// plain/secured SPDM, and an inner app header inside secured records
/// distinguishing SPDM traffic from application payloads.
pub trait SpdmTransportEncap {
    fn encap(
        &mut self,
        spdm_buffer: &[u8],
        transport_buffer: &mut [u8],
        secured_message: bool,
    ) -> SpdmResult<usize>;

    fn decap(&mut self, transport_buffer: &[u8], spdm_buffer: &mut [u8])
        -> SpdmResult<(usize, bool)>;

    fn encap_app(
        &mut self,
        spdm_buffer: &[u8],
        app_buffer: &mut [u8],
        is_app_message: bool,
    ) -> SpdmResult<usize>;

    fn decap_app(
        &mut self,
        app_buffer: &[u8],
        spdm_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmConnectionState {
    SpdmConnectionNotStarted,
    SpdmConnectionAfterVersion,
    SpdmConnectionAfterCapabilities,
    SpdmConnectionNegotiated,
    SpdmConnectionAfterDigest,
    SpdmConnectionAfterCertificate,
    SpdmConnectionAuthenticated,
}

impl Default for SpdmConnectionState {
    fn default() -> SpdmConnectionState {
        SpdmConnectionState::SpdmConnectionNotStarted
    }
}

impl SpdmConnectionState {
    /// Phase ordering, for "at least this far along" checks.
    pub fn rank(&self) -> u8 {
        match self {
            SpdmConnectionState::SpdmConnectionNotStarted => 0,
            SpdmConnectionState::SpdmConnectionAfterVersion => 1,
            SpdmConnectionState::SpdmConnectionAfterCapabilities => 2,
            SpdmConnectionState::SpdmConnectionNegotiated => 3,
            SpdmConnectionState::SpdmConnectionAfterDigest => 4,
            SpdmConnectionState::SpdmConnectionAfterCertificate => 5,
            SpdmConnectionState::SpdmConnectionAuthenticated => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmResponseState {
    SpdmResponseStateNormal,
    SpdmResponseStateBusy,
    SpdmResponseStateNeedResync,
    SpdmResponseStateNotReady,
    SpdmResponseStateProcessingEncap,
}

impl Default for SpdmResponseState {
    fn default() -> SpdmResponseState {
        SpdmResponseState::SpdmResponseStateNormal
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmConfigInfo {
    pub spdm_version: [SpdmVersion; config::MAX_SPDM_VERSION_COUNT],
    pub req_capabilities: SpdmRequestCapabilityFlags,
    pub rsp_capabilities: SpdmResponseCapabilityFlags,
    pub req_ct_exponent: u8,
    pub rsp_ct_exponent: u8,
    pub measurement_specification: SpdmMeasurementSpecification,
    pub measurement_hash_algo: SpdmMeasurementHashAlgo,
    pub base_hash_algo: SpdmBaseHashAlgo,
    pub base_asym_algo: SpdmBaseAsymAlgo,
    pub req_asym_algo: SpdmReqAsymAlgo,
    pub dhe_algo: SpdmDheAlgo,
    pub aead_algo: SpdmAeadAlgo,
    pub key_schedule_algo: SpdmKeyScheduleAlgo,
    pub heartbeat_period: u8,
    pub psk: SpdmPskStruct,
    pub psk_hint: SpdmPskHintStruct,
    pub max_retry_times: usize,
    /// Responder policy: demand mutual authentication through the
    /// encapsulated flow during session establishment.
    pub mut_auth_requested: bool,
}

#[derive(Debug, Clone, Copy, Zeroize)]
pub struct SpdmPskHintStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_PSK_HINT_SIZE],
}

impl Default for SpdmPskHintStruct {
    fn default() -> SpdmPskHintStruct {
        SpdmPskHintStruct {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_PSK_HINT_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmPskHintStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmNegotiateInfo {
    pub spdm_version_sel: SpdmVersion,
    pub req_capabilities_sel: SpdmRequestCapabilityFlags,
    pub rsp_capabilities_sel: SpdmResponseCapabilityFlags,
    pub req_ct_exponent_sel: u8,
    pub rsp_ct_exponent_sel: u8,
    pub measurement_specification_sel: SpdmMeasurementSpecification,
    pub measurement_hash_sel: SpdmMeasurementHashAlgo,
    pub base_hash_sel: SpdmBaseHashAlgo,
    pub base_asym_sel: SpdmBaseAsymAlgo,
    pub dhe_sel: SpdmDheAlgo,
    pub aead_sel: SpdmAeadAlgo,
    pub req_asym_sel: SpdmReqAsymAlgo,
    pub key_schedule_sel: SpdmKeyScheduleAlgo,
}

#[derive(Debug, Clone)]
pub struct SpdmRuntimeInfo {
    connection_state: SpdmConnectionState,
    response_state: SpdmResponseState,
    pub need_measurement_summary_hash: bool,
    pub need_measurement_signature: bool,
    pub message_a: ManagedBufferA,
    pub message_b: ManagedBufferB,
    pub message_c: ManagedBufferC,
    pub message_m: ManagedBufferM,
    /// Slot digests reported by the peer's DIGESTS response.
    pub peer_digests: [Option<SpdmDigestStruct>; config::SPDM_MAX_SLOT_NUMBER],
    /// Deferred-response bookkeeping (responder side).
    pub current_token: u8,
    pub error_data: Option<SpdmErrorResponseNotReadyExtData>,
    pub cache_spdm_request: [u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE],
    pub cache_spdm_request_size: usize,
}

impl Default for SpdmRuntimeInfo {
    fn default() -> SpdmRuntimeInfo {
        SpdmRuntimeInfo {
            connection_state: SpdmConnectionState::default(),
            response_state: SpdmResponseState::default(),
            need_measurement_summary_hash: false,
            need_measurement_signature: false,
            message_a: ManagedBufferA::default(),
            message_b: ManagedBufferB::default(),
            message_c: ManagedBufferC::default(),
            message_m: ManagedBufferM::default(),
            peer_digests: [None; config::SPDM_MAX_SLOT_NUMBER],
            current_token: 0,
            error_data: None,
            cache_spdm_request: [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE],
            cache_spdm_request_size: 0,
        }
    }
}

impl SpdmRuntimeInfo {
    pub fn set_connection_state(&mut self, connection_state: SpdmConnectionState) {
        self.connection_state = connection_state;
    }

    pub fn get_connection_state(&self) -> SpdmConnectionState {
        self.connection_state
    }

    pub fn set_response_state(&mut self, response_state: SpdmResponseState) {
        self.response_state = response_state;
    }

    pub fn get_response_state(&self) -> SpdmResponseState {
        self.response_state
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmProvisionInfo {
    pub my_cert_chain_data: [Option<SpdmCertChainData>; config::SPDM_MAX_SLOT_NUMBER],
    /// Wire-format chains (header + root hash + DER), built at init from
    /// `my_cert_chain_data`.
    pub my_cert_chain: [Option<SpdmCertChainBuffer>; config::SPDM_MAX_SLOT_NUMBER],
    pub peer_root_cert_data: Option<SpdmCertChainData>,
}

#[derive(Debug, Clone, Default)]
pub struct SpdmPeerInfo {
    pub peer_cert_chain: [Option<SpdmCertChainBuffer>; config::SPDM_MAX_SLOT_NUMBER],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmEncapState {
    SpdmEncapNotStarted,
    SpdmEncapGetDigest,
    SpdmEncapGetCertificate,
    SpdmEncapComplete,
}

impl Default for SpdmEncapState {
    fn default() -> SpdmEncapState {
        SpdmEncapState::SpdmEncapNotStarted
    }
}

/// Responder-side progress of one encapsulated exchange (mutual-auth
/// provisioning of the requester's chain).
#[derive(Debug, Clone, Default)]
pub struct SpdmEncapContext {
    pub encap_state: SpdmEncapState,
    pub request_id: u8,
    pub req_slot_id: u8,
    pub cert_chain_offset: u16,
    pub peer_cert_chain_temp: SpdmCertChainData,
    pub peer_digest: Option<SpdmDigestStruct>,
}

pub struct SpdmContext<'a> {
    pub device_io: &'a mut dyn SpdmDeviceIo,
    pub transport_encap: &'a mut dyn SpdmTransportEncap,
    pub config_info: SpdmConfigInfo,
    pub negotiate_info: SpdmNegotiateInfo,
    pub runtime_info: SpdmRuntimeInfo,
    pub provision_info: SpdmProvisionInfo,
    pub peer_info: SpdmPeerInfo,
    pub encap_context: SpdmEncapContext,
    pub session: [SpdmSession; config::MAX_SPDM_SESSION_COUNT],
}

impl<'a> SpdmContext<'a> {
    pub fn new(
        device_io: &'a mut dyn SpdmDeviceIo,
        transport_encap: &'a mut dyn SpdmTransportEncap,
        config_info: SpdmConfigInfo,
        provision_info: SpdmProvisionInfo,
    ) -> Self {
        SpdmContext {
            device_io,
            transport_encap,
            config_info,
            negotiate_info: SpdmNegotiateInfo::default(),
            runtime_info: SpdmRuntimeInfo::default(),
            provision_info,
            peer_info: SpdmPeerInfo::default(),
            encap_context: SpdmEncapContext::default(),
            session: [SpdmSession::new(); config::MAX_SPDM_SESSION_COUNT],
        }
    }

    pub fn get_session_via_id(&mut self, session_id: u32) -> Option<&mut SpdmSession> {
        self.session
            .iter_mut()
            .find(|session| session.get_session_id() == session_id)
    }

    pub fn get_immutable_session_via_id(&self, session_id: u32) -> Option<&SpdmSession> {
        self.session
            .iter()
            .find(|session| session.get_session_id() == session_id)
    }

    pub fn get_next_avaiable_session(&mut self) -> Option<&mut SpdmSession> {
        self.get_session_via_id(INVALID_SESSION_ID)
    }

    pub fn remove_session_via_id(&mut self, session_id: u32) {
        if let Some(session) = self.get_session_via_id(session_id) {
            session.teardown();
        }
    }

    pub fn reset_runtime_info(&mut self) {
        self.runtime_info = SpdmRuntimeInfo::default();
    }

    /// Back to a blank pre-GET_VERSION state, dropping every session.
    pub fn reset_context(&mut self) {
        self.negotiate_info = SpdmNegotiateInfo::default();
        self.reset_runtime_info();
        self.peer_info = SpdmPeerInfo::default();
        self.encap_context = SpdmEncapContext::default();
        for session in self.session.iter_mut() {
            session.teardown();
        }
    }

    pub fn append_message_a(&mut self, new_message: &[u8]) -> SpdmResult {
        self.runtime_info
            .message_a
            .append_message(new_message)
            .map(|_| ())
            .ok_or_else(|| spdm_err!(BufferTooSmall))
    }

    pub fn append_message_b(&mut self, new_message: &[u8]) -> SpdmResult {
        self.runtime_info
            .message_b
            .append_message(new_message)
            .map(|_| ())
            .ok_or_else(|| spdm_err!(BufferTooSmall))
    }

    pub fn append_message_c(&mut self, new_message: &[u8]) -> SpdmResult {
        self.runtime_info
            .message_c
            .append_message(new_message)
            .map(|_| ())
            .ok_or_else(|| spdm_err!(BufferTooSmall))
    }

    pub fn append_message_m(
        &mut self,
        session_id: Option<u32>,
        new_message: &[u8],
    ) -> SpdmResult {
        match session_id {
            None => self
                .runtime_info
                .message_m
                .append_message(new_message)
                .map(|_| ())
                .ok_or_else(|| spdm_err!(BufferTooSmall)),
            Some(session_id) => {
                let session = self
                    .get_session_via_id(session_id)
                    .ok_or_else(|| spdm_err!(SessionRequired))?;
                session
                    .runtime_info
                    .message_m
                    .append_message(new_message)
                    .map(|_| ())
                    .ok_or_else(|| spdm_err!(BufferTooSmall))
            }
        }
    }

    pub fn reset_message_m(&mut self, session_id: Option<u32>) {
        match session_id {
            None => self.runtime_info.message_m.reset_message(),
            Some(session_id) => {
                if let Some(session) = self.get_session_via_id(session_id) {
                    session.runtime_info.message_m.reset_message();
                }
            }
        }
    }

    /// M1/M2: the negotiation, identity, and challenge phases chained.
    pub fn calc_m1m2(&self) -> SpdmResult<ManagedBufferM1M2> {
        let mut message = ManagedBufferM1M2::default();
        message
            .append_message(self.runtime_info.message_a.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        message
            .append_message(self.runtime_info.message_b.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        message
            .append_message(self.runtime_info.message_c.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        Ok(message)
    }

    /// L1/L2: negotiation plus the measurement exchanges.
    pub fn calc_l1l2(&self, session_id: Option<u32>) -> SpdmResult<ManagedBufferL1L2> {
        let mut message = ManagedBufferL1L2::default();
        message
            .append_message(self.runtime_info.message_a.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        let message_m = match session_id {
            None => &self.runtime_info.message_m,
            Some(session_id) => {
                &self
                    .get_immutable_session_via_id(session_id)
                    .ok_or_else(|| spdm_err!(SessionRequired))?
                    .runtime_info
                    .message_m
            }
        };
        message
            .append_message(message_m.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        Ok(message)
    }

    /// TH as seen by the requester: its copy of the responder cert chain.
    pub fn calc_req_transcript_data(
        &self,
        use_psk: bool,
        slot_id: u8,
        message_k: &ManagedBufferK,
        message_f: Option<&ManagedBufferF>,
    ) -> SpdmResult<ManagedBufferTH> {
        let mut message = ManagedBufferTH::default();
        message
            .append_message(self.runtime_info.message_a.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        if !use_psk {
            let cert_chain = self.peer_info.peer_cert_chain[slot_id as usize]
                .as_ref()
                .ok_or_else(|| spdm_err!(InvalidParameter))?;
            message
                .append_message(cert_chain.as_ref())
                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        }
        message
            .append_message(message_k.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        if let Some(message_f) = message_f {
            message
                .append_message(message_f.as_ref())
                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        }
        Ok(message)
    }

    /// TH as seen by the responder: its own provisioned chain.
    pub fn calc_rsp_transcript_data(
        &self,
        use_psk: bool,
        slot_id: u8,
        message_k: &ManagedBufferK,
        message_f: Option<&ManagedBufferF>,
    ) -> SpdmResult<ManagedBufferTH> {
        let mut message = ManagedBufferTH::default();
        message
            .append_message(self.runtime_info.message_a.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        if !use_psk {
            let cert_chain = self.provision_info.my_cert_chain[slot_id as usize]
                .as_ref()
                .ok_or_else(|| spdm_err!(InvalidParameter))?;
            message
                .append_message(cert_chain.as_ref())
                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        }
        message
            .append_message(message_k.as_ref())
            .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        if let Some(message_f) = message_f {
            message
                .append_message(message_f.as_ref())
                .ok_or_else(|| spdm_err!(BufferTooSmall))?;
        }
        Ok(message)
    }

    pub fn calc_req_transcript_hash(
        &self,
        use_psk: bool,
        slot_id: u8,
        message_k: &ManagedBufferK,
        message_f: Option<&ManagedBufferF>,
    ) -> SpdmResult<SpdmDigestStruct> {
        let transcript = self.calc_req_transcript_data(use_psk, slot_id, message_k, message_f)?;
        crate::crypto::hash::hash_all(self.negotiate_info.base_hash_sel, transcript.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))
    }

    pub fn calc_rsp_transcript_hash(
        &self,
        use_psk: bool,
        slot_id: u8,
        message_k: &ManagedBufferK,
        message_f: Option<&ManagedBufferF>,
    ) -> SpdmResult<SpdmDigestStruct> {
        let transcript = self.calc_rsp_transcript_data(use_psk, slot_id, message_k, message_f)?;
        crate::crypto::hash::hash_all(self.negotiate_info.base_hash_sel, transcript.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))
    }

    pub fn encap(
        &mut self,
        send_buffer: &[u8],
        transport_buffer: &mut [u8],
    ) -> SpdmResult<usize> {
        self.transport_encap
            .encap(send_buffer, transport_buffer, false)
    }

    pub fn decap(
        &mut self,
        transport_buffer: &[u8],
        receive_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)> {
        self.transport_encap.decap(transport_buffer, receive_buffer)
    }

    /// App-frame, seal, and transport-frame one in-session message.
    pub fn encode_secured_message(
        &mut self,
        session_id: u32,
        send_buffer: &[u8],
        transport_buffer: &mut [u8],
        is_requester: bool,
        is_app_message: bool,
    ) -> SpdmResult<usize> {
        let mut app_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let app_used =
            self.transport_encap
                .encap_app(send_buffer, &mut app_buffer, is_app_message)?;

        let mut secured_buffer = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
        let session = self
            .get_session_via_id(session_id)
            .ok_or_else(|| spdm_err!(SessionRequired))?;
        let secured_used = session.encode_spdm_secured_message(
            &app_buffer[..app_used],
            &mut secured_buffer,
            is_requester,
        )?;

        self.transport_encap
            .encap(&secured_buffer[..secured_used], transport_buffer, true)
    }

    /// Open one already-decapped secured record. An AEAD failure tears the
    /// session down before surfacing. Returns size and the app-message flag.
    pub fn decode_secured_message(
        &mut self,
        session_id: u32,
        secured_buffer: &[u8],
        receive_buffer: &mut [u8],
        is_requester_message: bool,
    ) -> SpdmResult<(usize, bool)> {
        let mut app_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let session = self
            .get_session_via_id(session_id)
            .ok_or_else(|| spdm_err!(SessionRequired))?;
        let app_used = match session.decode_spdm_secured_message(
            secured_buffer,
            &mut app_buffer,
            is_requester_message,
        ) {
            Ok(app_used) => app_used,
            Err(err) => {
                error!("secured message decode fail, tearing session down\n");
                session.teardown();
                return Err(err);
            }
        };

        self.transport_encap
            .decap_app(&app_buffer[..app_used], receive_buffer)
    }
}

/// Read the session id off the front of a secured record.
pub fn get_secured_message_session_id(secured_buffer: &[u8]) -> SpdmResult<u32> {
    if secured_buffer.len() < 4 {
        return spdm_result_err!(InvalidMessageField);
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&secured_buffer[0..4]);
    Ok(u32::from_le_bytes(raw))
}
