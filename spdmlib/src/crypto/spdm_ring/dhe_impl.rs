// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto::{SpdmDhe, SpdmDheKeyExchange};
use crate::protocol::{SpdmDheAlgo, SpdmDheExchangeStruct, SpdmDheFinalKeyStruct};

pub static DEFAULT: SpdmDhe = SpdmDhe {
    generate_key_pair_cb: generate_key_pair,
};

fn generate_key_pair(
    dhe_algo: SpdmDheAlgo,
) -> Option<(SpdmDheExchangeStruct, Box<dyn SpdmDheKeyExchange>)> {
    match dhe_algo {
        SpdmDheAlgo::SECP_256_R1 => SpdmDheKeyExchangeP256::generate_key_pair(),
        SpdmDheAlgo::SECP_384_R1 => SpdmDheKeyExchangeP384::generate_key_pair(),
        _ => None,
    }
}

// The wire carries X || Y without the uncompressed-point prefix byte;
// ring wants the prefixed form.

struct SpdmDheKeyExchangeP256(ring::agreement::EphemeralPrivateKey);

impl SpdmDheKeyExchangeP256 {
    fn generate_key_pair() -> Option<(SpdmDheExchangeStruct, Box<dyn SpdmDheKeyExchange>)> {
        let rng = ring::rand::SystemRandom::new();
        let private_key =
            ring::agreement::EphemeralPrivateKey::generate(&ring::agreement::ECDH_P256, &rng)
                .ok()?;
        let public_key = private_key.compute_public_key().ok()?;
        let exchange = SpdmDheExchangeStruct::from_data(&public_key.as_ref()[1..]);
        Some((exchange, Box::new(SpdmDheKeyExchangeP256(private_key))))
    }
}

impl SpdmDheKeyExchange for SpdmDheKeyExchangeP256 {
    fn compute_final_key(
        self: Box<Self>,
        peer_pub_key: &SpdmDheExchangeStruct,
    ) -> Option<SpdmDheFinalKeyStruct> {
        if peer_pub_key.as_ref().len() != 64 {
            return None;
        }
        let mut point = [0u8; 65];
        point[0] = 0x04;
        point[1..].copy_from_slice(peer_pub_key.as_ref());
        let peer_public =
            ring::agreement::UnparsedPublicKey::new(&ring::agreement::ECDH_P256, &point[..]);
        ring::agreement::agree_ephemeral(self.0, &peer_public, |shared| {
            SpdmDheFinalKeyStruct::from_data(shared)
        })
        .ok()
    }
}

struct SpdmDheKeyExchangeP384(ring::agreement::EphemeralPrivateKey);

impl SpdmDheKeyExchangeP384 {
    fn generate_key_pair() -> Option<(SpdmDheExchangeStruct, Box<dyn SpdmDheKeyExchange>)> {
        let rng = ring::rand::SystemRandom::new();
        let private_key =
            ring::agreement::EphemeralPrivateKey::generate(&ring::agreement::ECDH_P384, &rng)
                .ok()?;
        let public_key = private_key.compute_public_key().ok()?;
        let exchange = SpdmDheExchangeStruct::from_data(&public_key.as_ref()[1..]);
        Some((exchange, Box::new(SpdmDheKeyExchangeP384(private_key))))
    }
}

impl SpdmDheKeyExchange for SpdmDheKeyExchangeP384 {
    fn compute_final_key(
        self: Box<Self>,
        peer_pub_key: &SpdmDheExchangeStruct,
    ) -> Option<SpdmDheFinalKeyStruct> {
        if peer_pub_key.as_ref().len() != 96 {
            return None;
        }
        let mut point = [0u8; 97];
        point[0] = 0x04;
        point[1..].copy_from_slice(peer_pub_key.as_ref());
        let peer_public =
            ring::agreement::UnparsedPublicKey::new(&ring::agreement::ECDH_P384, &point[..]);
        ring::agreement::agree_ephemeral(self.0, &peer_public, |shared| {
            SpdmDheFinalKeyStruct::from_data(shared)
        })
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_both_sides_agree() {
        let (pub_a, exchange_a) = generate_key_pair(SpdmDheAlgo::SECP_384_R1).unwrap();
        let (pub_b, exchange_b) = generate_key_pair(SpdmDheAlgo::SECP_384_R1).unwrap();
        assert_eq!(pub_a.as_ref().len(), 96);

        let secret_a = exchange_a.compute_final_key(&pub_b).unwrap();
        let secret_b = exchange_b.compute_final_key(&pub_a).unwrap();
        assert_eq!(secret_a.as_ref(), secret_b.as_ref());
        assert_eq!(secret_a.as_ref().len(), 48);
    }

    #[test]
    fn test_case1_unsupported_group() {
        assert!(generate_key_pair(SpdmDheAlgo::FFDHE_2048).is_none());
    }
}
