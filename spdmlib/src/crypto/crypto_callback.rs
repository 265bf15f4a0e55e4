// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::error::SpdmResult;
use crate::protocol::{
    SpdmAeadAlgo, SpdmAeadIvStruct, SpdmAeadKeyStruct, SpdmBaseAsymAlgo, SpdmBaseHashAlgo,
    SpdmDheAlgo, SpdmDheExchangeStruct, SpdmDheFinalKeyStruct, SpdmDigestStruct,
    SpdmSignatureStruct,
};

#[derive(Clone)]
pub struct SpdmHash {
    pub hash_all_cb: fn(base_hash_algo: SpdmBaseHashAlgo, data: &[u8]) -> Option<SpdmDigestStruct>,
    pub hash_ctx_init_cb: fn(base_hash_algo: SpdmBaseHashAlgo) -> Option<Box<dyn SpdmHashContext>>,
}

/// A running digest. `duplicate` checkpoints the state, so a caller can
/// hash up to a marker, branch, and keep folding bytes into the original.
pub trait SpdmHashContext {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Option<SpdmDigestStruct>;
    fn duplicate(&self) -> Box<dyn SpdmHashContext>;
}

/// A running HMAC over a fixed key.
pub trait SpdmHmacContext {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Option<SpdmDigestStruct>;
}

#[derive(Clone)]
pub struct SpdmHmac {
    pub hmac_cb:
        fn(base_hash_algo: SpdmBaseHashAlgo, key: &[u8], data: &[u8]) -> Option<SpdmDigestStruct>,
    pub hmac_verify_cb: fn(
        base_hash_algo: SpdmBaseHashAlgo,
        key: &[u8],
        data: &[u8],
        hmac: &SpdmDigestStruct,
    ) -> SpdmResult,
    pub hmac_ctx_init_cb:
        fn(base_hash_algo: SpdmBaseHashAlgo, key: &[u8]) -> Option<Box<dyn SpdmHmacContext>>,
}

#[derive(Clone)]
pub struct SpdmHkdf {
    pub hkdf_extract_cb: fn(
        hash_algo: SpdmBaseHashAlgo,
        salt: &[u8],
        ikm: &[u8],
    ) -> Option<SpdmDigestStruct>,
    pub hkdf_expand_cb: fn(
        hash_algo: SpdmBaseHashAlgo,
        prk: &[u8],
        info: &[u8],
        out_size: u16,
    ) -> Option<SpdmDigestStruct>,
}

#[derive(Clone)]
pub struct SpdmAead {
    pub encrypt_cb: fn(
        aead_algo: SpdmAeadAlgo,
        key: &SpdmAeadKeyStruct,
        iv: &SpdmAeadIvStruct,
        aad: &[u8],
        plain_text: &[u8],
        tag: &mut [u8],
        cipher_text: &mut [u8],
    ) -> SpdmResult<(usize, usize)>,

    pub decrypt_cb: fn(
        aead_algo: SpdmAeadAlgo,
        key: &SpdmAeadKeyStruct,
        iv: &SpdmAeadIvStruct,
        aad: &[u8],
        cipher_text: &[u8],
        tag: &[u8],
        plain_text: &mut [u8],
    ) -> SpdmResult<usize>,
}

#[derive(Clone)]
pub struct SpdmAsymVerify {
    pub verify_cb: fn(
        base_hash_algo: SpdmBaseHashAlgo,
        base_asym_algo: SpdmBaseAsymAlgo,
        public_cert_der: &[u8],
        data: &[u8],
        signature: &SpdmSignatureStruct,
    ) -> SpdmResult,
}

#[derive(Clone)]
pub struct SpdmAsymSign {
    pub sign_cb: fn(
        base_hash_algo: SpdmBaseHashAlgo,
        base_asym_algo: SpdmBaseAsymAlgo,
        data: &[u8],
    ) -> Option<SpdmSignatureStruct>,
}

/// An in-flight ephemeral key agreement; consumed by the shared-secret
/// computation so the private part cannot be reused.
pub trait SpdmDheKeyExchange {
    fn compute_final_key(
        self: Box<Self>,
        peer_pub_key: &SpdmDheExchangeStruct,
    ) -> Option<SpdmDheFinalKeyStruct>;
}

#[derive(Clone)]
pub struct SpdmDhe {
    pub generate_key_pair_cb:
        fn(dhe_algo: SpdmDheAlgo) -> Option<(SpdmDheExchangeStruct, Box<dyn SpdmDheKeyExchange>)>,
}

#[derive(Clone)]
pub struct SpdmCertOperation {
    /// Locate one DER certificate inside a concatenated chain; `-1` means
    /// the last (leaf) certificate. Returns `(begin, end)` offsets.
    pub get_cert_from_cert_chain_cb: fn(cert_chain: &[u8], index: isize) -> SpdmResult<(usize, usize)>,
    pub verify_cert_chain_cb: fn(cert_chain: &[u8]) -> SpdmResult,
}

#[derive(Clone)]
pub struct SpdmCryptoRandom {
    pub get_random_cb: fn(data: &mut [u8]) -> SpdmResult<usize>,
}
