// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto::SpdmCryptoRandom;
use crate::error::SpdmResult;
use crate::spdm_err;
use ring::rand::SecureRandom;

pub static DEFAULT: SpdmCryptoRandom = SpdmCryptoRandom {
    get_random_cb: get_random,
};

fn get_random(data: &mut [u8]) -> SpdmResult<usize> {
    let rng = ring::rand::SystemRandom::new();
    rng.fill(data).map_err(|_| spdm_err!(DeviceError))?;
    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_fills_requested_length() {
        let mut data = [0u8; 64];
        assert_eq!(get_random(&mut data).unwrap(), 64);
        // 64 zero bytes from a CSPRNG would be remarkable
        assert!(data.iter().any(|b| *b != 0));
    }
}
