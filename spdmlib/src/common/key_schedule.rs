// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! The SPDM key schedule. Secrets flow
//! `IKM -> handshake_secret -> (traffic handshake secrets, finished keys)`
//! then `handshake_secret -> master_secret -> (traffic data secrets)`, each
//! step an HKDF extract or an HKDF-Expand-Label with the "spdm1.1 " label
//! prefix. AEAD keys and IV salts hang off the traffic secrets.

use crate::crypto;
use crate::protocol::{
    SpdmAeadAlgo, SpdmAeadIvStruct, SpdmAeadKeyStruct, SpdmBaseHashAlgo, SpdmDigestStruct,
    SPDM_MAX_HASH_SIZE,
};

pub const SPDM_BIN_CONCAT_LABEL: &[u8] = b"spdm1.1 ";

const BIN_STR_FINISHED_LABEL: &[u8] = b"finished";
const BIN_STR_REQ_HS_LABEL: &[u8] = b"req hs data";
const BIN_STR_RSP_HS_LABEL: &[u8] = b"rsp hs data";
const BIN_STR_REQ_APP_LABEL: &[u8] = b"req app data";
const BIN_STR_RSP_APP_LABEL: &[u8] = b"rsp app data";
const BIN_STR_KEY_LABEL: &[u8] = b"key";
const BIN_STR_IV_LABEL: &[u8] = b"iv";
const BIN_STR_UPDATE_LABEL: &[u8] = b"key update";

const MAX_BIN_CONCAT_BUF_SIZE: usize = 2 + 8 + 12 + SPDM_MAX_HASH_SIZE;

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmKeySchedule;

impl SpdmKeySchedule {
    pub fn derive_handshake_secret(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        ikm: &[u8],
    ) -> Option<SpdmDigestStruct> {
        let salt = [0u8; SPDM_MAX_HASH_SIZE];
        crypto::hkdf::hkdf_extract(hash_algo, &salt[..hash_algo.get_size() as usize], ikm)
    }

    pub fn derive_master_secret(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        handshake_secret: &SpdmDigestStruct,
    ) -> Option<SpdmDigestStruct> {
        let ikm = [0u8; SPDM_MAX_HASH_SIZE];
        crypto::hkdf::hkdf_extract(
            hash_algo,
            handshake_secret.as_ref(),
            &ikm[..hash_algo.get_size() as usize],
        )
    }

    pub fn derive_request_handshake_secret(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        handshake_secret: &SpdmDigestStruct,
        th1_hash: &[u8],
    ) -> Option<SpdmDigestStruct> {
        self.expand_label(
            hash_algo,
            handshake_secret.as_ref(),
            BIN_STR_REQ_HS_LABEL,
            Some(th1_hash),
            hash_algo.get_size(),
        )
    }

    pub fn derive_response_handshake_secret(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        handshake_secret: &SpdmDigestStruct,
        th1_hash: &[u8],
    ) -> Option<SpdmDigestStruct> {
        self.expand_label(
            hash_algo,
            handshake_secret.as_ref(),
            BIN_STR_RSP_HS_LABEL,
            Some(th1_hash),
            hash_algo.get_size(),
        )
    }

    pub fn derive_finished_key(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        traffic_secret: &SpdmDigestStruct,
    ) -> Option<SpdmDigestStruct> {
        self.expand_label(
            hash_algo,
            traffic_secret.as_ref(),
            BIN_STR_FINISHED_LABEL,
            None,
            hash_algo.get_size(),
        )
    }

    pub fn derive_request_data_secret(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        master_secret: &SpdmDigestStruct,
        th2_hash: &[u8],
    ) -> Option<SpdmDigestStruct> {
        self.expand_label(
            hash_algo,
            master_secret.as_ref(),
            BIN_STR_REQ_APP_LABEL,
            Some(th2_hash),
            hash_algo.get_size(),
        )
    }

    pub fn derive_response_data_secret(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        master_secret: &SpdmDigestStruct,
        th2_hash: &[u8],
    ) -> Option<SpdmDigestStruct> {
        self.expand_label(
            hash_algo,
            master_secret.as_ref(),
            BIN_STR_RSP_APP_LABEL,
            Some(th2_hash),
            hash_algo.get_size(),
        )
    }

    pub fn derive_update_secret(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        traffic_secret: &SpdmDigestStruct,
    ) -> Option<SpdmDigestStruct> {
        self.expand_label(
            hash_algo,
            traffic_secret.as_ref(),
            BIN_STR_UPDATE_LABEL,
            None,
            hash_algo.get_size(),
        )
    }

    pub fn derive_aead_key(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        aead_algo: SpdmAeadAlgo,
        traffic_secret: &SpdmDigestStruct,
    ) -> Option<SpdmAeadKeyStruct> {
        let size = aead_algo.get_key_size();
        let okm = self.expand_label(
            hash_algo,
            traffic_secret.as_ref(),
            BIN_STR_KEY_LABEL,
            None,
            size,
        )?;
        let mut key = SpdmAeadKeyStruct {
            data_size: size,
            ..Default::default()
        };
        key.data[..size as usize].copy_from_slice(okm.as_ref());
        Some(key)
    }

    pub fn derive_aead_iv(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        aead_algo: SpdmAeadAlgo,
        traffic_secret: &SpdmDigestStruct,
    ) -> Option<SpdmAeadIvStruct> {
        let size = aead_algo.get_iv_size();
        let okm = self.expand_label(
            hash_algo,
            traffic_secret.as_ref(),
            BIN_STR_IV_LABEL,
            None,
            size,
        )?;
        let mut iv = SpdmAeadIvStruct {
            data_size: size,
            ..Default::default()
        };
        iv.data[..size as usize].copy_from_slice(okm.as_ref());
        Some(iv)
    }

    fn expand_label(
        &self,
        hash_algo: SpdmBaseHashAlgo,
        secret: &[u8],
        label: &[u8],
        context: Option<&[u8]>,
        length: u16,
    ) -> Option<SpdmDigestStruct> {
        let mut info = [0u8; MAX_BIN_CONCAT_BUF_SIZE];
        let info = self.binconcat(length, label, context, &mut info)?;
        crypto::hkdf::hkdf_expand(hash_algo, secret, info, length)
    }

    fn binconcat<'a>(
        &self,
        length: u16,
        label: &[u8],
        context: Option<&[u8]>,
        buffer: &'a mut [u8],
    ) -> Option<&'a [u8]> {
        let mut used = 0usize;
        let total = 2
            + SPDM_BIN_CONCAT_LABEL.len()
            + label.len()
            + context.map_or(0, |c| c.len());
        if total > buffer.len() {
            return None;
        }
        buffer[used..used + 2].copy_from_slice(&length.to_le_bytes());
        used += 2;
        buffer[used..used + SPDM_BIN_CONCAT_LABEL.len()].copy_from_slice(SPDM_BIN_CONCAT_LABEL);
        used += SPDM_BIN_CONCAT_LABEL.len();
        buffer[used..used + label.len()].copy_from_slice(label);
        used += label.len();
        if let Some(context) = context {
            buffer[used..used + context.len()].copy_from_slice(context);
            used += context.len();
        }
        Some(&buffer[..used])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_binconcat_layout() {
        let schedule = SpdmKeySchedule;
        let mut buffer = [0u8; MAX_BIN_CONCAT_BUF_SIZE];
        let info = schedule
            .binconcat(48, b"req hs data", Some(&[0xaa; 4]), &mut buffer)
            .unwrap();
        assert_eq!(&info[..2], &48u16.to_le_bytes());
        assert_eq!(&info[2..10], b"spdm1.1 ");
        assert_eq!(&info[10..21], b"req hs data");
        assert_eq!(&info[21..], &[0xaa; 4]);
    }

    #[test]
    fn test_case0_schedule_is_deterministic() {
        let schedule = SpdmKeySchedule;
        let hash_algo = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        let ikm = [0x42u8; 48];
        let a = schedule.derive_handshake_secret(hash_algo, &ikm).unwrap();
        let b = schedule.derive_handshake_secret(hash_algo, &ikm).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
        assert_eq!(a.data_size, 48);

        let th1 = [0x10u8; 48];
        let req = schedule
            .derive_request_handshake_secret(hash_algo, &a, &th1)
            .unwrap();
        let rsp = schedule
            .derive_response_handshake_secret(hash_algo, &a, &th1)
            .unwrap();
        assert_ne!(req.as_ref(), rsp.as_ref());

        let key = schedule
            .derive_aead_key(hash_algo, SpdmAeadAlgo::AES_256_GCM, &req)
            .unwrap();
        assert_eq!(key.data_size, 32);
        let iv = schedule
            .derive_aead_iv(hash_algo, SpdmAeadAlgo::AES_256_GCM, &req)
            .unwrap();
        assert_eq!(iv.data_size, 12);
    }
}
