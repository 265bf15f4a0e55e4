// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto::{SpdmHmac, SpdmHmacContext};
use crate::error::SpdmResult;
use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct};
use crate::{spdm_err, spdm_result_err};

pub static DEFAULT: SpdmHmac = SpdmHmac {
    hmac_cb: hmac,
    hmac_verify_cb: hmac_verify,
    hmac_ctx_init_cb: hmac_ctx_init,
};

fn algorithm_for(base_hash_algo: SpdmBaseHashAlgo) -> Option<ring::hmac::Algorithm> {
    match base_hash_algo {
        SpdmBaseHashAlgo::TPM_ALG_SHA_256 => Some(ring::hmac::HMAC_SHA256),
        SpdmBaseHashAlgo::TPM_ALG_SHA_384 => Some(ring::hmac::HMAC_SHA384),
        SpdmBaseHashAlgo::TPM_ALG_SHA_512 => Some(ring::hmac::HMAC_SHA512),
        _ => None,
    }
}

fn hmac(base_hash_algo: SpdmBaseHashAlgo, key: &[u8], data: &[u8]) -> Option<SpdmDigestStruct> {
    let algorithm = algorithm_for(base_hash_algo)?;
    let key = ring::hmac::Key::new(algorithm, key);
    let tag = ring::hmac::sign(&key, data);
    Some(SpdmDigestStruct::from_data(tag.as_ref()))
}

fn hmac_verify(
    base_hash_algo: SpdmBaseHashAlgo,
    key: &[u8],
    data: &[u8],
    hmac: &SpdmDigestStruct,
) -> SpdmResult {
    let algorithm = algorithm_for(base_hash_algo).ok_or_else(|| spdm_err!(Unsupported))?;
    let key = ring::hmac::Key::new(algorithm, key);
    match ring::hmac::verify(&key, data, hmac.as_ref()) {
        Ok(()) => Ok(()),
        Err(_) => spdm_result_err!(SecurityViolation),
    }
}

struct SpdmRingHmacContext(ring::hmac::Context);

impl SpdmHmacContext for SpdmRingHmacContext {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Option<SpdmDigestStruct> {
        Some(SpdmDigestStruct::from_data(self.0.sign().as_ref()))
    }
}

fn hmac_ctx_init(
    base_hash_algo: SpdmBaseHashAlgo,
    key: &[u8],
) -> Option<Box<dyn SpdmHmacContext>> {
    let algorithm = algorithm_for(base_hash_algo)?;
    let key = ring::hmac::Key::new(algorithm, key);
    Some(Box::new(SpdmRingHmacContext(ring::hmac::Context::with_key(
        &key,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_sign_then_verify() {
        let key = [0x0b; 48];
        let mac = hmac(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &key, b"what do ya want").unwrap();
        assert_eq!(mac.data_size, 48);
        assert!(hmac_verify(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &key, b"what do ya want", &mac)
            .is_ok());
        assert!(hmac_verify(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &key, b"tampered", &mac).is_err());
    }

    #[test]
    fn test_case1_incremental_matches_one_shot() {
        let key = [0x0b; 48];
        let mut context = hmac_ctx_init(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &key).unwrap();
        context.update(b"what do ");
        context.update(b"ya want");
        let incremental = context.finalize().unwrap();
        let one_shot = hmac(SpdmBaseHashAlgo::TPM_ALG_SHA_384, &key, b"what do ya want").unwrap();
        assert_eq!(incremental.as_ref(), one_shot.as_ref());
    }
}
