// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Pluggable crypto surface. Every primitive the engine touches goes
//! through a one-shot registry: embedders may `register()` their own
//! backend before first use, otherwise the ring-based default (feature
//! `spdm-ring`) is installed lazily. Signing has no default; private keys
//! stay with the embedder.

mod crypto_callback;
pub use crypto_callback::*;

#[cfg(feature = "spdm-ring")]
pub mod spdm_ring;

pub mod hash {
    use super::SpdmHash;
    use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct};
    use conquer_once::spin::OnceCell;

    static CRYPTO_HASH: OnceCell<SpdmHash> = OnceCell::uninit();

    pub fn register(context: SpdmHash) -> bool {
        CRYPTO_HASH.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmHash> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_HASH
                .try_get_or_init(|| super::spdm_ring::hash_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_HASH.try_get().ok()
        }
    }

    pub fn hash_all(base_hash_algo: SpdmBaseHashAlgo, data: &[u8]) -> Option<SpdmDigestStruct> {
        (instance()?.hash_all_cb)(base_hash_algo, data)
    }

    pub fn hash_ctx_init(
        base_hash_algo: SpdmBaseHashAlgo,
    ) -> Option<Box<dyn super::SpdmHashContext>> {
        (instance()?.hash_ctx_init_cb)(base_hash_algo)
    }
}

pub mod hmac {
    use super::SpdmHmac;
    use crate::error::SpdmResult;
    use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct};
    use crate::spdm_result_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_HMAC: OnceCell<SpdmHmac> = OnceCell::uninit();

    pub fn register(context: SpdmHmac) -> bool {
        CRYPTO_HMAC.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmHmac> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_HMAC
                .try_get_or_init(|| super::spdm_ring::hmac_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_HMAC.try_get().ok()
        }
    }

    pub fn hmac(
        base_hash_algo: SpdmBaseHashAlgo,
        key: &[u8],
        data: &[u8],
    ) -> Option<SpdmDigestStruct> {
        (instance()?.hmac_cb)(base_hash_algo, key, data)
    }

    pub fn hmac_verify(
        base_hash_algo: SpdmBaseHashAlgo,
        key: &[u8],
        data: &[u8],
        hmac: &SpdmDigestStruct,
    ) -> SpdmResult {
        match instance() {
            Some(context) => (context.hmac_verify_cb)(base_hash_algo, key, data, hmac),
            None => spdm_result_err!(Unsupported),
        }
    }

    pub fn hmac_ctx_init(
        base_hash_algo: SpdmBaseHashAlgo,
        key: &[u8],
    ) -> Option<Box<dyn super::SpdmHmacContext>> {
        (instance()?.hmac_ctx_init_cb)(base_hash_algo, key)
    }
}

pub mod hkdf {
    use super::SpdmHkdf;
    use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct};
    use conquer_once::spin::OnceCell;

    static CRYPTO_HKDF: OnceCell<SpdmHkdf> = OnceCell::uninit();

    pub fn register(context: SpdmHkdf) -> bool {
        CRYPTO_HKDF.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmHkdf> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_HKDF
                .try_get_or_init(|| super::spdm_ring::hkdf_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_HKDF.try_get().ok()
        }
    }

    pub fn hkdf_extract(
        hash_algo: SpdmBaseHashAlgo,
        salt: &[u8],
        ikm: &[u8],
    ) -> Option<SpdmDigestStruct> {
        (instance()?.hkdf_extract_cb)(hash_algo, salt, ikm)
    }

    pub fn hkdf_expand(
        hash_algo: SpdmBaseHashAlgo,
        prk: &[u8],
        info: &[u8],
        out_size: u16,
    ) -> Option<SpdmDigestStruct> {
        (instance()?.hkdf_expand_cb)(hash_algo, prk, info, out_size)
    }
}

pub mod aead {
    use super::SpdmAead;
    use crate::error::SpdmResult;
    use crate::protocol::{SpdmAeadAlgo, SpdmAeadIvStruct, SpdmAeadKeyStruct};
    use crate::spdm_result_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_AEAD: OnceCell<SpdmAead> = OnceCell::uninit();

    pub fn register(context: SpdmAead) -> bool {
        CRYPTO_AEAD.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmAead> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_AEAD
                .try_get_or_init(|| super::spdm_ring::aead_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_AEAD.try_get().ok()
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn encrypt(
        aead_algo: SpdmAeadAlgo,
        key: &SpdmAeadKeyStruct,
        iv: &SpdmAeadIvStruct,
        aad: &[u8],
        plain_text: &[u8],
        tag: &mut [u8],
        cipher_text: &mut [u8],
    ) -> SpdmResult<(usize, usize)> {
        match instance() {
            Some(context) => {
                (context.encrypt_cb)(aead_algo, key, iv, aad, plain_text, tag, cipher_text)
            }
            None => spdm_result_err!(Unsupported),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn decrypt(
        aead_algo: SpdmAeadAlgo,
        key: &SpdmAeadKeyStruct,
        iv: &SpdmAeadIvStruct,
        aad: &[u8],
        cipher_text: &[u8],
        tag: &[u8],
        plain_text: &mut [u8],
    ) -> SpdmResult<usize> {
        match instance() {
            Some(context) => {
                (context.decrypt_cb)(aead_algo, key, iv, aad, cipher_text, tag, plain_text)
            }
            None => spdm_result_err!(Unsupported),
        }
    }
}

pub mod asym_verify {
    use super::SpdmAsymVerify;
    use crate::error::SpdmResult;
    use crate::protocol::{SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SpdmSignatureStruct};
    use crate::spdm_result_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_ASYM_VERIFY: OnceCell<SpdmAsymVerify> = OnceCell::uninit();

    pub fn register(context: SpdmAsymVerify) -> bool {
        CRYPTO_ASYM_VERIFY.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmAsymVerify> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_ASYM_VERIFY
                .try_get_or_init(|| super::spdm_ring::asym_verify_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_ASYM_VERIFY.try_get().ok()
        }
    }

    pub fn verify(
        base_hash_algo: SpdmBaseHashAlgo,
        base_asym_algo: SpdmBaseAsymAlgo,
        public_cert_der: &[u8],
        data: &[u8],
        signature: &SpdmSignatureStruct,
    ) -> SpdmResult {
        match instance() {
            Some(context) => {
                (context.verify_cb)(base_hash_algo, base_asym_algo, public_cert_der, data, signature)
            }
            None => spdm_result_err!(Unsupported),
        }
    }
}

pub mod asym_sign {
    use super::SpdmAsymSign;
    use crate::protocol::{SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SpdmSignatureStruct};
    use conquer_once::spin::OnceCell;

    static CRYPTO_ASYM_SIGN: OnceCell<SpdmAsymSign> = OnceCell::uninit();

    pub fn register(context: SpdmAsymSign) -> bool {
        CRYPTO_ASYM_SIGN.try_init_once(|| context).is_ok()
    }

    pub fn sign(
        base_hash_algo: SpdmBaseHashAlgo,
        base_asym_algo: SpdmBaseAsymAlgo,
        data: &[u8],
    ) -> Option<SpdmSignatureStruct> {
        let context = CRYPTO_ASYM_SIGN.try_get().ok()?;
        (context.sign_cb)(base_hash_algo, base_asym_algo, data)
    }
}

pub mod dhe {
    use super::{SpdmDhe, SpdmDheKeyExchange};
    use crate::protocol::{SpdmDheAlgo, SpdmDheExchangeStruct};
    use conquer_once::spin::OnceCell;

    static CRYPTO_DHE: OnceCell<SpdmDhe> = OnceCell::uninit();

    pub fn register(context: SpdmDhe) -> bool {
        CRYPTO_DHE.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmDhe> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_DHE
                .try_get_or_init(|| super::spdm_ring::dhe_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_DHE.try_get().ok()
        }
    }

    pub fn generate_key_pair(
        dhe_algo: SpdmDheAlgo,
    ) -> Option<(SpdmDheExchangeStruct, Box<dyn SpdmDheKeyExchange>)> {
        (instance()?.generate_key_pair_cb)(dhe_algo)
    }
}

pub mod cert_operation {
    use super::SpdmCertOperation;
    use crate::error::SpdmResult;
    use crate::spdm_result_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_CERT_OPERATION: OnceCell<SpdmCertOperation> = OnceCell::uninit();

    pub fn register(context: SpdmCertOperation) -> bool {
        CRYPTO_CERT_OPERATION.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmCertOperation> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_CERT_OPERATION
                .try_get_or_init(|| super::spdm_ring::cert_operation_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_CERT_OPERATION.try_get().ok()
        }
    }

    pub fn get_cert_from_cert_chain(cert_chain: &[u8], index: isize) -> SpdmResult<(usize, usize)> {
        match instance() {
            Some(context) => (context.get_cert_from_cert_chain_cb)(cert_chain, index),
            None => spdm_result_err!(Unsupported),
        }
    }

    pub fn verify_cert_chain(cert_chain: &[u8]) -> SpdmResult {
        match instance() {
            Some(context) => (context.verify_cert_chain_cb)(cert_chain),
            None => spdm_result_err!(Unsupported),
        }
    }
}

pub mod rand {
    use super::SpdmCryptoRandom;
    use crate::error::SpdmResult;
    use crate::spdm_result_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_RAND: OnceCell<SpdmCryptoRandom> = OnceCell::uninit();

    pub fn register(context: SpdmCryptoRandom) -> bool {
        CRYPTO_RAND.try_init_once(|| context).is_ok()
    }

    fn instance() -> Option<&'static SpdmCryptoRandom> {
        #[cfg(feature = "spdm-ring")]
        {
            CRYPTO_RAND
                .try_get_or_init(|| super::spdm_ring::rand_impl::DEFAULT.clone())
                .ok()
        }
        #[cfg(not(feature = "spdm-ring"))]
        {
            CRYPTO_RAND.try_get().ok()
        }
    }

    pub fn get_random(data: &mut [u8]) -> SpdmResult<usize> {
        match instance() {
            Some(context) => (context.get_random_cb)(data),
            None => spdm_result_err!(Unsupported),
        }
    }
}
