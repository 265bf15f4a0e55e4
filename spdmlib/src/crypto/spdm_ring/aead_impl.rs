// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::config;
use crate::crypto::SpdmAead;
use crate::error::SpdmResult;
use crate::protocol::{SpdmAeadAlgo, SpdmAeadIvStruct, SpdmAeadKeyStruct};
use crate::{spdm_err, spdm_result_err};

pub static DEFAULT: SpdmAead = SpdmAead {
    encrypt_cb: encrypt,
    decrypt_cb: decrypt,
};

fn algorithm_for(aead_algo: SpdmAeadAlgo) -> Option<&'static ring::aead::Algorithm> {
    match aead_algo {
        SpdmAeadAlgo::AES_128_GCM => Some(&ring::aead::AES_128_GCM),
        SpdmAeadAlgo::AES_256_GCM => Some(&ring::aead::AES_256_GCM),
        SpdmAeadAlgo::CHACHA20_POLY1305 => Some(&ring::aead::CHACHA20_POLY1305),
        _ => None,
    }
}

fn make_key(
    algorithm: &'static ring::aead::Algorithm,
    key: &SpdmAeadKeyStruct,
) -> SpdmResult<ring::aead::LessSafeKey> {
    if key.as_ref().len() != algorithm.key_len() {
        return spdm_result_err!(InvalidParameter);
    }
    let unbound = ring::aead::UnboundKey::new(algorithm, key.as_ref())
        .map_err(|_| spdm_err!(InvalidParameter))?;
    Ok(ring::aead::LessSafeKey::new(unbound))
}

fn encrypt(
    aead_algo: SpdmAeadAlgo,
    key: &SpdmAeadKeyStruct,
    iv: &SpdmAeadIvStruct,
    aad: &[u8],
    plain_text: &[u8],
    tag: &mut [u8],
    cipher_text: &mut [u8],
) -> SpdmResult<(usize, usize)> {
    let algorithm = algorithm_for(aead_algo).ok_or_else(|| spdm_err!(Unsupported))?;
    if tag.len() != algorithm.tag_len() || cipher_text.len() < plain_text.len() {
        return spdm_result_err!(InvalidParameter);
    }
    let less_safe_key = make_key(algorithm, key)?;
    let nonce = ring::aead::Nonce::try_assume_unique_for_key(iv.as_ref())
        .map_err(|_| spdm_err!(InvalidParameter))?;

    cipher_text[..plain_text.len()].copy_from_slice(plain_text);
    let out_tag = less_safe_key
        .seal_in_place_separate_tag(
            nonce,
            ring::aead::Aad::from(aad),
            &mut cipher_text[..plain_text.len()],
        )
        .map_err(|_| spdm_err!(SecurityViolation))?;
    tag.copy_from_slice(out_tag.as_ref());
    Ok((plain_text.len(), tag.len()))
}

fn decrypt(
    aead_algo: SpdmAeadAlgo,
    key: &SpdmAeadKeyStruct,
    iv: &SpdmAeadIvStruct,
    aad: &[u8],
    cipher_text: &[u8],
    tag: &[u8],
    plain_text: &mut [u8],
) -> SpdmResult<usize> {
    let algorithm = algorithm_for(aead_algo).ok_or_else(|| spdm_err!(Unsupported))?;
    let in_out_size = cipher_text.len() + tag.len();
    if tag.len() != algorithm.tag_len()
        || plain_text.len() < cipher_text.len()
        || in_out_size > config::MAX_SPDM_TRANSPORT_SIZE
    {
        return spdm_result_err!(InvalidParameter);
    }
    let less_safe_key = make_key(algorithm, key)?;
    let nonce = ring::aead::Nonce::try_assume_unique_for_key(iv.as_ref())
        .map_err(|_| spdm_err!(InvalidParameter))?;

    let mut in_out = [0u8; config::MAX_SPDM_TRANSPORT_SIZE];
    in_out[..cipher_text.len()].copy_from_slice(cipher_text);
    in_out[cipher_text.len()..in_out_size].copy_from_slice(tag);

    let plain = less_safe_key
        .open_in_place(nonce, ring::aead::Aad::from(aad), &mut in_out[..in_out_size])
        .map_err(|_| spdm_err!(SecurityViolation))?;
    plain_text[..plain.len()].copy_from_slice(plain);
    Ok(plain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SpdmAeadKeyStruct {
        let mut key = SpdmAeadKeyStruct {
            data_size: 32,
            ..Default::default()
        };
        key.data[..32].copy_from_slice(&[0x24u8; 32]);
        key
    }

    fn test_iv() -> SpdmAeadIvStruct {
        let mut iv = SpdmAeadIvStruct {
            data_size: 12,
            ..Default::default()
        };
        iv.data[..12].copy_from_slice(&[0x11u8; 12]);
        iv
    }

    #[test]
    fn test_case0_seal_open_round_trip() {
        let plain = [0x33u8; 100];
        let mut cipher = [0u8; 100];
        let mut tag = [0u8; 16];
        let (cipher_used, tag_used) = encrypt(
            SpdmAeadAlgo::AES_256_GCM,
            &test_key(),
            &test_iv(),
            b"aad",
            &plain,
            &mut tag,
            &mut cipher,
        )
        .unwrap();
        assert_eq!((cipher_used, tag_used), (100, 16));
        assert_ne!(&cipher[..], &plain[..]);

        let mut opened = [0u8; 100];
        let size = decrypt(
            SpdmAeadAlgo::AES_256_GCM,
            &test_key(),
            &test_iv(),
            b"aad",
            &cipher,
            &tag,
            &mut opened,
        )
        .unwrap();
        assert_eq!(size, 100);
        assert_eq!(&opened[..], &plain[..]);
    }

    #[test]
    fn test_case1_tag_mismatch_fails() {
        let plain = [0x33u8; 32];
        let mut cipher = [0u8; 32];
        let mut tag = [0u8; 16];
        encrypt(
            SpdmAeadAlgo::AES_256_GCM,
            &test_key(),
            &test_iv(),
            b"aad",
            &plain,
            &mut tag,
            &mut cipher,
        )
        .unwrap();
        tag[0] ^= 1;
        let mut opened = [0u8; 32];
        assert!(decrypt(
            SpdmAeadAlgo::AES_256_GCM,
            &test_key(),
            &test_iv(),
            b"aad",
            &cipher,
            &tag,
            &mut opened,
        )
        .is_err());
    }

    #[test]
    fn test_case2_wrong_aad_fails() {
        let plain = [0x33u8; 32];
        let mut cipher = [0u8; 32];
        let mut tag = [0u8; 16];
        encrypt(
            SpdmAeadAlgo::AES_256_GCM,
            &test_key(),
            &test_iv(),
            b"aad",
            &plain,
            &mut tag,
            &mut cipher,
        )
        .unwrap();
        let mut opened = [0u8; 32];
        assert!(decrypt(
            SpdmAeadAlgo::AES_256_GCM,
            &test_key(),
            &test_iv(),
            b"bad",
            &cipher,
            &tag,
            &mut opened,
        )
        .is_err());
    }
}
