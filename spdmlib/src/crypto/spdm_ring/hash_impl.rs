// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto::{SpdmHash, SpdmHashContext};
use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct};

pub static DEFAULT: SpdmHash = SpdmHash {
    hash_all_cb: hash_all,
    hash_ctx_init_cb: hash_ctx_init,
};

fn algorithm_for(base_hash_algo: SpdmBaseHashAlgo) -> Option<&'static ring::digest::Algorithm> {
    match base_hash_algo {
        SpdmBaseHashAlgo::TPM_ALG_SHA_256 => Some(&ring::digest::SHA256),
        SpdmBaseHashAlgo::TPM_ALG_SHA_384 => Some(&ring::digest::SHA384),
        SpdmBaseHashAlgo::TPM_ALG_SHA_512 => Some(&ring::digest::SHA512),
        _ => None,
    }
}

fn hash_all(base_hash_algo: SpdmBaseHashAlgo, data: &[u8]) -> Option<SpdmDigestStruct> {
    let algorithm = algorithm_for(base_hash_algo)?;
    let digest = ring::digest::digest(algorithm, data);
    Some(SpdmDigestStruct::from_data(digest.as_ref()))
}

struct SpdmRingHashContext(ring::digest::Context);

impl SpdmHashContext for SpdmRingHashContext {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Option<SpdmDigestStruct> {
        Some(SpdmDigestStruct::from_data(self.0.finish().as_ref()))
    }

    fn duplicate(&self) -> Box<dyn SpdmHashContext> {
        Box::new(SpdmRingHashContext(self.0.clone()))
    }
}

fn hash_ctx_init(base_hash_algo: SpdmBaseHashAlgo) -> Option<Box<dyn SpdmHashContext>> {
    let algorithm = algorithm_for(base_hash_algo)?;
    Some(Box::new(SpdmRingHashContext(ring::digest::Context::new(
        algorithm,
    ))))
}
