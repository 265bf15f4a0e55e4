// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! One SPDM secure session: handshake and data traffic secrets, the AEAD
//! record layer with implicit sequence numbers, and mid-session key
//! rotation. Secrets never leave this module except through the crypto
//! callbacks; discarded generations are zeroized.

use crate::common::key_schedule::SpdmKeySchedule;
use crate::common::transcript::{ManagedBufferF, ManagedBufferK, ManagedBufferM};
use crate::error::SpdmResult;
use crate::protocol::*;
use crate::{spdm_err, spdm_result_err};
use zeroize::Zeroize;

pub const INVALID_SESSION_ID: u32 = 0;

const SECURED_MESSAGE_HEADER_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmSessionState {
    SpdmSessionNotStarted,
    SpdmSessionHandshaking,
    SpdmSessionEstablished,
    SpdmSessionEndSessionReceived,
}

impl Default for SpdmSessionState {
    fn default() -> SpdmSessionState {
        SpdmSessionState::SpdmSessionNotStarted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmSessionType {
    SpdmSessionMacOnly,
    SpdmSessionEncMac,
}

impl Default for SpdmSessionType {
    fn default() -> SpdmSessionType {
        SpdmSessionType::SpdmSessionEncMac
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmSessionCryptoParam {
    pub base_hash_algo: SpdmBaseHashAlgo,
    pub dhe_algo: SpdmDheAlgo,
    pub aead_algo: SpdmAeadAlgo,
    pub key_schedule_algo: SpdmKeyScheduleAlgo,
}

#[derive(Debug, Clone, Copy, Default, Zeroize)]
pub struct SpdmSessionMasterSecret {
    pub dhe_secret: SpdmDheFinalKeyStruct,
    pub handshake_secret: SpdmDigestStruct,
    pub master_secret: SpdmDigestStruct,
}

/// One direction of one key generation.
#[derive(Debug, Clone, Copy, Default, Zeroize)]
pub struct SpdmSessionSecretParam {
    pub secret: SpdmDigestStruct,
    pub encryption_key: SpdmAeadKeyStruct,
    pub salt: SpdmAeadIvStruct,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, Copy, Default, Zeroize)]
pub struct SpdmSessionHandshakeSecret {
    pub request_direction: SpdmSessionSecretParam,
    pub response_direction: SpdmSessionSecretParam,
    pub request_finished_key: SpdmDigestStruct,
    pub response_finished_key: SpdmDigestStruct,
}

#[derive(Debug, Clone, Copy, Default, Zeroize)]
pub struct SpdmSessionApplicationSecret {
    pub request_direction: SpdmSessionSecretParam,
    pub response_direction: SpdmSessionSecretParam,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmSessionRuntimeInfo {
    pub message_k: ManagedBufferK,
    pub message_f: ManagedBufferF,
    pub message_m: ManagedBufferM,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmSession {
    session_id: u32,
    session_state: SpdmSessionState,
    pub session_type: SpdmSessionType,
    pub use_psk: bool,
    pub slot_id: u8,
    /// Slot the peer asked this side to authenticate with (mutual auth).
    pub req_slot_id: u8,
    pub mut_auth_requested: bool,
    pub heartbeat_period: u8,
    pub crypto_param: SpdmSessionCryptoParam,
    pub master_secret: SpdmSessionMasterSecret,
    pub handshake_secret: SpdmSessionHandshakeSecret,
    pub application_secret: SpdmSessionApplicationSecret,
    pub application_secret_backup: SpdmSessionApplicationSecret,
    pub runtime_info: SpdmSessionRuntimeInfo,
    key_schedule: SpdmKeySchedule,
}

impl SpdmSession {
    pub fn new() -> SpdmSession {
        SpdmSession::default()
    }

    pub fn setup(&mut self, session_id: u32) -> SpdmResult {
        if self.session_id != INVALID_SESSION_ID {
            return spdm_result_err!(InvalidParameter);
        }
        self.session_id = session_id;
        Ok(())
    }

    /// Zeroize every secret and return the slot to its unused state.
    pub fn teardown(&mut self) {
        self.master_secret.zeroize();
        self.handshake_secret.zeroize();
        self.application_secret.zeroize();
        self.application_secret_backup.zeroize();
        *self = SpdmSession::default();
    }

    pub fn get_session_id(&self) -> u32 {
        self.session_id
    }

    pub fn set_crypto_param(
        &mut self,
        base_hash_algo: SpdmBaseHashAlgo,
        dhe_algo: SpdmDheAlgo,
        aead_algo: SpdmAeadAlgo,
        key_schedule_algo: SpdmKeyScheduleAlgo,
    ) {
        self.crypto_param = SpdmSessionCryptoParam {
            base_hash_algo,
            dhe_algo,
            aead_algo,
            key_schedule_algo,
        };
    }

    pub fn set_use_psk(&mut self, use_psk: bool) {
        self.use_psk = use_psk;
    }

    pub fn set_session_state(&mut self, session_state: SpdmSessionState) {
        self.session_state = session_state;
        if session_state == SpdmSessionState::SpdmSessionEstablished {
            // only the data traffic keys survive the handshake
            self.master_secret.zeroize();
            self.handshake_secret.zeroize();
        }
    }

    pub fn get_session_state(&self) -> SpdmSessionState {
        self.session_state
    }

    /// Store the key-schedule IKM: the DHE shared secret or the PSK.
    pub fn set_dhe_secret(&mut self, dhe_secret: SpdmDheFinalKeyStruct) {
        self.master_secret.dhe_secret = dhe_secret;
    }

    pub fn generate_handshake_secret(&mut self, th1: &SpdmDigestStruct) -> SpdmResult {
        let hash_algo = self.crypto_param.base_hash_algo;
        let schedule = self.key_schedule;

        let handshake_secret = schedule
            .derive_handshake_secret(hash_algo, self.master_secret.dhe_secret.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))?;
        self.master_secret.handshake_secret = handshake_secret;

        let request_secret = schedule
            .derive_request_handshake_secret(hash_algo, &handshake_secret, th1.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))?;
        let response_secret = schedule
            .derive_response_handshake_secret(hash_algo, &handshake_secret, th1.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))?;

        self.handshake_secret.request_direction = self.derive_direction(&request_secret)?;
        self.handshake_secret.response_direction = self.derive_direction(&response_secret)?;
        self.handshake_secret.request_finished_key = schedule
            .derive_finished_key(hash_algo, &request_secret)
            .ok_or_else(|| spdm_err!(DeviceError))?;
        self.handshake_secret.response_finished_key = schedule
            .derive_finished_key(hash_algo, &response_secret)
            .ok_or_else(|| spdm_err!(DeviceError))?;
        Ok(())
    }

    pub fn generate_data_secret(&mut self, th2: &SpdmDigestStruct) -> SpdmResult {
        let hash_algo = self.crypto_param.base_hash_algo;
        let schedule = self.key_schedule;

        let master_secret = schedule
            .derive_master_secret(hash_algo, &self.master_secret.handshake_secret)
            .ok_or_else(|| spdm_err!(DeviceError))?;
        self.master_secret.master_secret = master_secret;

        let request_secret = schedule
            .derive_request_data_secret(hash_algo, &master_secret, th2.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))?;
        let response_secret = schedule
            .derive_response_data_secret(hash_algo, &master_secret, th2.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))?;

        self.application_secret.request_direction = self.derive_direction(&request_secret)?;
        self.application_secret.response_direction = self.derive_direction(&response_secret)?;
        Ok(())
    }

    fn derive_direction(&self, secret: &SpdmDigestStruct) -> SpdmResult<SpdmSessionSecretParam> {
        let hash_algo = self.crypto_param.base_hash_algo;
        let aead_algo = self.crypto_param.aead_algo;
        Ok(SpdmSessionSecretParam {
            secret: *secret,
            encryption_key: self
                .key_schedule
                .derive_aead_key(hash_algo, aead_algo, secret)
                .ok_or_else(|| spdm_err!(DeviceError))?,
            salt: self
                .key_schedule
                .derive_aead_iv(hash_algo, aead_algo, secret)
                .ok_or_else(|| spdm_err!(DeviceError))?,
            sequence_number: 0,
        })
    }

    pub fn generate_hmac_with_request_finished_key(
        &self,
        message: &[u8],
    ) -> SpdmResult<SpdmDigestStruct> {
        crate::crypto::hmac::hmac(
            self.crypto_param.base_hash_algo,
            self.handshake_secret.request_finished_key.as_ref(),
            message,
        )
        .ok_or_else(|| spdm_err!(DeviceError))
    }

    pub fn generate_hmac_with_response_finished_key(
        &self,
        message: &[u8],
    ) -> SpdmResult<SpdmDigestStruct> {
        crate::crypto::hmac::hmac(
            self.crypto_param.base_hash_algo,
            self.handshake_secret.response_finished_key.as_ref(),
            message,
        )
        .ok_or_else(|| spdm_err!(DeviceError))
    }

    pub fn verify_hmac_with_request_finished_key(
        &self,
        message: &[u8],
        hmac: &SpdmDigestStruct,
    ) -> SpdmResult {
        crate::crypto::hmac::hmac_verify(
            self.crypto_param.base_hash_algo,
            self.handshake_secret.request_finished_key.as_ref(),
            message,
            hmac,
        )
    }

    pub fn verify_hmac_with_response_finished_key(
        &self,
        message: &[u8],
        hmac: &SpdmDigestStruct,
    ) -> SpdmResult {
        crate::crypto::hmac::hmac_verify(
            self.crypto_param.base_hash_algo,
            self.handshake_secret.response_finished_key.as_ref(),
            message,
            hmac,
        )
    }

    /// Derive the next generation of data traffic secrets. The old
    /// generation stays in the backup set until the update round-trips.
    pub fn create_data_secret_update(
        &mut self,
        update_requester: bool,
        update_responder: bool,
    ) -> SpdmResult {
        let hash_algo = self.crypto_param.base_hash_algo;
        self.application_secret_backup = self.application_secret;

        if update_requester {
            let next = self
                .key_schedule
                .derive_update_secret(hash_algo, &self.application_secret.request_direction.secret)
                .ok_or_else(|| spdm_err!(DeviceError))?;
            self.application_secret.request_direction = self.derive_direction(&next)?;
        }
        if update_responder {
            let next = self
                .key_schedule
                .derive_update_secret(
                    hash_algo,
                    &self.application_secret.response_direction.secret,
                )
                .ok_or_else(|| spdm_err!(DeviceError))?;
            self.application_secret.response_direction = self.derive_direction(&next)?;
        }
        Ok(())
    }

    /// Commit (`use_new_key`) or roll back a pending key update, then
    /// zeroize the superseded generation.
    pub fn activate_data_secret_update(
        &mut self,
        update_requester: bool,
        update_responder: bool,
        use_new_key: bool,
    ) -> SpdmResult {
        if !use_new_key {
            if update_requester {
                self.application_secret.request_direction =
                    self.application_secret_backup.request_direction;
            }
            if update_responder {
                self.application_secret.response_direction =
                    self.application_secret_backup.response_direction;
            }
        }
        self.application_secret_backup.zeroize();
        Ok(())
    }

    /// Seal one message. `is_requester` selects the request-direction keys.
    /// Wire form: `session_id(4) || length(2) || ciphertext || tag`, with
    /// the 6-byte prefix as AAD and the implicit sequence number folded
    /// into the nonce.
    pub fn encode_spdm_secured_message(
        &mut self,
        app_buffer: &[u8],
        secured_buffer: &mut [u8],
        is_requester: bool,
    ) -> SpdmResult<usize> {
        let aead_algo = self.crypto_param.aead_algo;
        let tag_size = aead_algo.get_tag_size() as usize;
        let total_size = SECURED_MESSAGE_HEADER_SIZE + app_buffer.len() + tag_size;
        if secured_buffer.len() < total_size {
            return spdm_result_err!(BufferTooSmall);
        }

        let param = self.select_secret_param(is_requester)?;
        let sequence_number = param.sequence_number;
        if sequence_number == u64::MAX {
            return spdm_result_err!(DeviceError);
        }
        let key = param.encryption_key;
        let nonce = Self::compute_nonce(&param.salt, sequence_number);

        let length = (app_buffer.len() + tag_size) as u16;
        let mut aad = [0u8; SECURED_MESSAGE_HEADER_SIZE];
        aad[0..4].copy_from_slice(&self.session_id.to_le_bytes());
        aad[4..6].copy_from_slice(&length.to_le_bytes());

        let mut tag = [0u8; SPDM_MAX_AEAD_TAG_SIZE];
        let cipher_end = SECURED_MESSAGE_HEADER_SIZE + app_buffer.len();
        let (cipher_used, tag_used) = crate::crypto::aead::encrypt(
            aead_algo,
            &key,
            &nonce,
            &aad,
            app_buffer,
            &mut tag[..tag_size],
            &mut secured_buffer[SECURED_MESSAGE_HEADER_SIZE..cipher_end],
        )?;
        if cipher_used != app_buffer.len() || tag_used != tag_size {
            return spdm_result_err!(DeviceError);
        }

        secured_buffer[..SECURED_MESSAGE_HEADER_SIZE].copy_from_slice(&aad);
        secured_buffer[cipher_end..total_size].copy_from_slice(&tag[..tag_size]);
        self.bump_sequence_number(is_requester)?;
        Ok(total_size)
    }

    /// Open one message; `is_requester_message` selects the direction the
    /// record traveled. Any failure is fatal to the session (the caller
    /// tears it down): a gap in the implicit sequence shows up here as a
    /// nonce mismatch.
    pub fn decode_spdm_secured_message(
        &mut self,
        secured_buffer: &[u8],
        app_buffer: &mut [u8],
        is_requester_message: bool,
    ) -> SpdmResult<usize> {
        let aead_algo = self.crypto_param.aead_algo;
        let tag_size = aead_algo.get_tag_size() as usize;
        if secured_buffer.len() < SECURED_MESSAGE_HEADER_SIZE + tag_size {
            return spdm_result_err!(InvalidMessageField);
        }

        let mut raw_id = [0u8; 4];
        raw_id.copy_from_slice(&secured_buffer[0..4]);
        if u32::from_le_bytes(raw_id) != self.session_id {
            return spdm_result_err!(InvalidMessageField);
        }
        let mut raw_length = [0u8; 2];
        raw_length.copy_from_slice(&secured_buffer[4..6]);
        let length = u16::from_le_bytes(raw_length) as usize;
        if length != secured_buffer.len() - SECURED_MESSAGE_HEADER_SIZE || length < tag_size {
            return spdm_result_err!(InvalidMessageField);
        }
        let plain_size = length - tag_size;
        if app_buffer.len() < plain_size {
            return spdm_result_err!(BufferTooSmall);
        }

        let param = self.select_secret_param(is_requester_message)?;
        let key = param.encryption_key;
        let nonce = Self::compute_nonce(&param.salt, param.sequence_number);
        let aad = &secured_buffer[..SECURED_MESSAGE_HEADER_SIZE];
        let cipher_end = SECURED_MESSAGE_HEADER_SIZE + plain_size;

        let plain_used = crate::crypto::aead::decrypt(
            aead_algo,
            &key,
            &nonce,
            aad,
            &secured_buffer[SECURED_MESSAGE_HEADER_SIZE..cipher_end],
            &secured_buffer[cipher_end..],
            &mut app_buffer[..plain_size],
        )?;
        if plain_used != plain_size {
            return spdm_result_err!(SecurityViolation);
        }
        self.bump_sequence_number(is_requester_message)?;
        Ok(plain_size)
    }

    fn select_secret_param(&self, request_direction: bool) -> SpdmResult<SpdmSessionSecretParam> {
        let param = match self.session_state {
            SpdmSessionState::SpdmSessionHandshaking => {
                if request_direction {
                    self.handshake_secret.request_direction
                } else {
                    self.handshake_secret.response_direction
                }
            }
            SpdmSessionState::SpdmSessionEstablished
            | SpdmSessionState::SpdmSessionEndSessionReceived => {
                if request_direction {
                    self.application_secret.request_direction
                } else {
                    self.application_secret.response_direction
                }
            }
            SpdmSessionState::SpdmSessionNotStarted => {
                return spdm_result_err!(SessionRequired)
            }
        };
        if param.encryption_key.data_size == 0 || (param.salt.data_size as usize) < 8 {
            return spdm_result_err!(SessionRequired);
        }
        Ok(param)
    }

    fn bump_sequence_number(&mut self, request_direction: bool) -> SpdmResult {
        let param = match self.session_state {
            SpdmSessionState::SpdmSessionHandshaking => {
                if request_direction {
                    &mut self.handshake_secret.request_direction
                } else {
                    &mut self.handshake_secret.response_direction
                }
            }
            SpdmSessionState::SpdmSessionEstablished
            | SpdmSessionState::SpdmSessionEndSessionReceived => {
                if request_direction {
                    &mut self.application_secret.request_direction
                } else {
                    &mut self.application_secret.response_direction
                }
            }
            SpdmSessionState::SpdmSessionNotStarted => return spdm_result_err!(SessionRequired),
        };
        param.sequence_number += 1;
        Ok(())
    }

    fn compute_nonce(salt: &SpdmAeadIvStruct, sequence_number: u64) -> SpdmAeadIvStruct {
        let mut nonce = *salt;
        let iv_size = nonce.data_size as usize;
        for (i, byte) in sequence_number.to_be_bytes().iter().enumerate() {
            nonce.data[iv_size - 8 + i] ^= byte;
        }
        nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn establish_pair() -> (SpdmSession, SpdmSession) {
        let mut requester = SpdmSession::new();
        let mut responder = SpdmSession::new();
        for session in [&mut requester, &mut responder].iter_mut() {
            session.setup(0xfffe_fffd).unwrap();
            session.set_crypto_param(
                SpdmBaseHashAlgo::TPM_ALG_SHA_384,
                SpdmDheAlgo::SECP_384_R1,
                SpdmAeadAlgo::AES_256_GCM,
                SpdmKeyScheduleAlgo::SPDM_KEY_SCHEDULE,
            );
            session.set_dhe_secret(SpdmDheFinalKeyStruct::from_data(&[0x5a; 48]));
            let th1 = SpdmDigestStruct::from_data(&[0x11; 48]);
            session.generate_handshake_secret(&th1).unwrap();
            let th2 = SpdmDigestStruct::from_data(&[0x22; 48]);
            session.generate_data_secret(&th2).unwrap();
            session.set_session_state(SpdmSessionState::SpdmSessionEstablished);
        }
        (requester, responder)
    }

    #[test]
    fn test_case0_secured_message_round_trip() {
        let (mut requester, mut responder) = establish_pair();
        let plaintext = [0x41u8; 200];
        let mut record = [0u8; 256];
        let used = requester
            .encode_spdm_secured_message(&plaintext, &mut record, true)
            .unwrap();
        assert_eq!(used, 6 + 200 + 16);

        let mut decoded = [0u8; 256];
        let size = responder
            .decode_spdm_secured_message(&record[..used], &mut decoded, true)
            .unwrap();
        assert_eq!(&decoded[..size], &plaintext[..]);
    }

    #[test]
    fn test_case1_replay_is_rejected() {
        let (mut requester, mut responder) = establish_pair();
        let plaintext = [0x42u8; 64];
        let mut record = [0u8; 128];
        let used = requester
            .encode_spdm_secured_message(&plaintext, &mut record, true)
            .unwrap();

        let mut decoded = [0u8; 128];
        responder
            .decode_spdm_secured_message(&record[..used], &mut decoded, true)
            .unwrap();
        // same record again: the receive window moved on
        assert!(responder
            .decode_spdm_secured_message(&record[..used], &mut decoded, true)
            .is_err());
    }

    #[test]
    fn test_case2_sequence_gap_is_rejected() {
        let (mut requester, mut responder) = establish_pair();
        let mut record = [0u8; 128];
        let _ = requester
            .encode_spdm_secured_message(&[1u8; 16], &mut record, true)
            .unwrap();
        // drop the first record entirely
        let used = requester
            .encode_spdm_secured_message(&[2u8; 16], &mut record, true)
            .unwrap();
        let mut decoded = [0u8; 128];
        assert!(responder
            .decode_spdm_secured_message(&record[..used], &mut decoded, true)
            .is_err());
    }

    #[test]
    fn test_case3_key_update_both_directions_match() {
        let (mut requester, mut responder) = establish_pair();
        requester.create_data_secret_update(true, true).unwrap();
        responder.create_data_secret_update(true, true).unwrap();
        requester.activate_data_secret_update(true, true, true).unwrap();
        responder.activate_data_secret_update(true, true, true).unwrap();

        assert_eq!(
            requester.application_secret.request_direction.secret.as_ref(),
            responder.application_secret.request_direction.secret.as_ref()
        );
        assert_eq!(
            requester
                .application_secret
                .response_direction
                .encryption_key
                .as_ref(),
            responder
                .application_secret
                .response_direction
                .encryption_key
                .as_ref()
        );

        let mut record = [0u8; 128];
        let used = requester
            .encode_spdm_secured_message(&[9u8; 32], &mut record, true)
            .unwrap();
        let mut decoded = [0u8; 128];
        assert!(responder
            .decode_spdm_secured_message(&record[..used], &mut decoded, true)
            .is_ok());
    }

    #[test]
    fn test_case4_key_update_rollback_restores_old_generation() {
        let (mut requester, mut responder) = establish_pair();
        let old_secret = requester.application_secret.request_direction.secret;
        requester.create_data_secret_update(true, false).unwrap();
        assert_ne!(
            requester.application_secret.request_direction.secret.as_ref(),
            old_secret.as_ref()
        );
        requester
            .activate_data_secret_update(true, false, false)
            .unwrap();
        assert_eq!(
            requester.application_secret.request_direction.secret.as_ref(),
            old_secret.as_ref()
        );

        let mut record = [0u8; 128];
        let used = requester
            .encode_spdm_secured_message(&[7u8; 8], &mut record, true)
            .unwrap();
        let mut decoded = [0u8; 128];
        assert!(responder
            .decode_spdm_secured_message(&record[..used], &mut decoded, true)
            .is_ok());
    }

    #[test]
    fn test_case5_established_zeroizes_handshake_secret() {
        let (requester, _) = establish_pair();
        assert_eq!(requester.master_secret.handshake_secret.data_size, 0);
        assert_eq!(requester.master_secret.dhe_secret.data_size, 0);
        assert_eq!(
            requester.handshake_secret.request_direction.secret.data_size,
            0
        );
        assert!(requester
            .handshake_secret
            .request_finished_key
            .as_ref()
            .is_empty());
    }

    #[test]
    fn test_case6_teardown_clears_application_secret() {
        let (mut requester, _) = establish_pair();
        requester.teardown();
        assert_eq!(requester.get_session_id(), INVALID_SESSION_ID);
        assert_eq!(
            requester.application_secret.request_direction.secret.data_size,
            0
        );
        assert_eq!(
            requester
                .application_secret
                .request_direction
                .encryption_key
                .data_size,
            0
        );
    }
}
