// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto::SpdmHkdf;
use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct, SPDM_MAX_HASH_SIZE};

pub static DEFAULT: SpdmHkdf = SpdmHkdf {
    hkdf_extract_cb: hkdf_extract,
    hkdf_expand_cb: hkdf_expand,
};

fn hkdf_extract(
    hash_algo: SpdmBaseHashAlgo,
    salt: &[u8],
    ikm: &[u8],
) -> Option<SpdmDigestStruct> {
    // HKDF-Extract(salt, IKM) is HMAC(key = salt, message = IKM)
    crate::crypto::hmac::hmac(hash_algo, salt, ikm)
}

struct SpdmHkdfOutputKeyLength(usize);

impl ring::hkdf::KeyType for SpdmHkdfOutputKeyLength {
    fn len(&self) -> usize {
        self.0
    }
}

fn hkdf_expand(
    hash_algo: SpdmBaseHashAlgo,
    prk: &[u8],
    info: &[u8],
    out_size: u16,
) -> Option<SpdmDigestStruct> {
    if out_size as usize > SPDM_MAX_HASH_SIZE {
        return None;
    }
    let algorithm = match hash_algo {
        SpdmBaseHashAlgo::TPM_ALG_SHA_256 => ring::hkdf::HKDF_SHA256,
        SpdmBaseHashAlgo::TPM_ALG_SHA_384 => ring::hkdf::HKDF_SHA384,
        SpdmBaseHashAlgo::TPM_ALG_SHA_512 => ring::hkdf::HKDF_SHA512,
        _ => return None,
    };
    let prk = ring::hkdf::Prk::new_less_safe(algorithm, prk);
    let info = [info];
    let okm = prk
        .expand(&info, SpdmHkdfOutputKeyLength(out_size as usize))
        .ok()?;
    let mut output = SpdmDigestStruct {
        data_size: out_size,
        ..Default::default()
    };
    okm.fill(&mut output.data[..out_size as usize]).ok()?;
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_expand_is_deterministic_and_sized() {
        let prk = [0x42u8; 48];
        let a = hkdf_expand(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &prk, b"info", 32).unwrap();
        let b = hkdf_expand(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &prk, b"info", 32).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
        assert_eq!(a.data_size, 32);

        let c = hkdf_expand(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &prk, b"other", 32).unwrap();
        assert_ne!(a.as_ref(), c.as_ref());
    }

    #[test]
    fn test_case1_extract_matches_hmac() {
        let salt = [1u8; 48];
        let ikm = [2u8; 48];
        let extracted = hkdf_extract(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &salt, &ikm).unwrap();
        let hmac = crate::crypto::hmac::hmac(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &salt, &ikm)
            .unwrap();
        assert_eq!(extracted.as_ref(), hmac.as_ref());
    }
}
