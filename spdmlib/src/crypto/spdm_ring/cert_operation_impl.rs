// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto::SpdmCertOperation;
use crate::error::SpdmResult;
use crate::{spdm_err, spdm_result_err};
use core::convert::TryFrom;

pub static DEFAULT: SpdmCertOperation = SpdmCertOperation {
    get_cert_from_cert_chain_cb: get_cert_from_cert_chain,
    verify_cert_chain_cb: verify_cert_chain,
};

/// Walk a concatenated DER chain and return the `(begin, end)` offsets of
/// the certificate at `index`, or of the last one for `-1`.
pub fn get_cert_from_cert_chain(cert_chain: &[u8], index: isize) -> SpdmResult<(usize, usize)> {
    let mut offset = 0usize;
    let mut this_index = 0isize;
    loop {
        if cert_chain.len() < offset + 4 {
            return spdm_result_err!(InvalidMessageField);
        }
        if cert_chain[offset] != 0x30 || cert_chain[offset + 1] != 0x82 {
            return spdm_result_err!(InvalidMessageField);
        }
        let this_cert_len =
            ((cert_chain[offset + 2] as usize) << 8) + (cert_chain[offset + 3] as usize) + 4;
        if cert_chain.len() < offset + this_cert_len {
            return spdm_result_err!(InvalidMessageField);
        }
        if this_index == index {
            return Ok((offset, offset + this_cert_len));
        }
        this_index += 1;
        if (offset + this_cert_len == cert_chain.len()) && (index == -1) {
            // the last one
            return Ok((offset, offset + this_cert_len));
        }
        offset += this_cert_len;
    }
}

fn split_cert_chain(cert_chain: &[u8]) -> SpdmResult<Vec<&[u8]>> {
    let mut certs = Vec::new();
    let input = untrusted::Input::from(cert_chain);
    let mut reader = untrusted::Reader::new(input);
    while !reader.at_end() {
        let (cert, _) = reader
            .read_partial(|reader| {
                let tag = reader.read_byte()?;
                if tag != 0x30 {
                    return Err(untrusted::EndOfInput);
                }
                let first = reader.read_byte()?;
                let length = if first & 0x80 == 0 {
                    first as usize
                } else {
                    let byte_count = (first & 0x7f) as usize;
                    if byte_count == 0 || byte_count > 2 {
                        return Err(untrusted::EndOfInput);
                    }
                    let mut length = 0usize;
                    for _ in 0..byte_count {
                        length = (length << 8) | reader.read_byte()? as usize;
                    }
                    length
                };
                reader.read_bytes(length)?;
                Ok(())
            })
            .map_err(|_| spdm_err!(InvalidMessageField))?;
        certs.push(cert.as_slice_less_safe());
    }
    Ok(certs)
}

fn verify_cert_chain(cert_chain: &[u8]) -> SpdmResult {
    static ALL_SIGALGS: &[&webpki::SignatureAlgorithm] = &[
        &webpki::RSA_PKCS1_2048_8192_SHA256,
        &webpki::RSA_PKCS1_2048_8192_SHA384,
        &webpki::RSA_PKCS1_2048_8192_SHA512,
        &webpki::ECDSA_P256_SHA256,
        &webpki::ECDSA_P256_SHA384,
        &webpki::ECDSA_P384_SHA256,
        &webpki::ECDSA_P384_SHA384,
    ];

    let certs = split_cert_chain(cert_chain)?;
    let certs_len = certs.len();
    let (ca, inters, ee): (&[u8], &[&[u8]], &[u8]) = match certs_len {
        0 => return spdm_result_err!(InvalidMessageField),
        1 => (certs[0], &[], certs[0]),
        2 => (certs[0], &[], certs[1]),
        n => (certs[0], &certs[1..(n - 1)], certs[n - 1]),
    };

    let anchors = if let Ok(trust_anchor) = webpki::TrustAnchor::try_from_cert_der(ca) {
        vec![trust_anchor]
    } else {
        return spdm_result_err!(SecurityViolation);
    };

    #[cfg(feature = "std")]
    let timestamp = {
        if let Ok(duration) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            duration.as_secs()
        } else {
            return spdm_result_err!(DeviceError);
        }
    };
    #[cfg(not(feature = "std"))]
    let timestamp = 0u64;
    let time = webpki::Time::from_seconds_since_unix_epoch(timestamp);

    let cert = if let Ok(end_entity_cert) = webpki::EndEntityCert::try_from(ee) {
        end_entity_cert
    } else {
        return spdm_result_err!(SecurityViolation);
    };

    // device chains reuse the TLS server profile here; embedders with a
    // stricter EKU policy register their own verifier
    if cert
        .verify_is_valid_tls_server_cert(
            ALL_SIGALGS,
            &webpki::TlsServerTrustAnchors(&anchors),
            inters,
            time,
        )
        .is_ok()
    {
        info!("cert verification pass\n");
        Ok(())
    } else {
        error!("cert verification fail\n");
        spdm_result_err!(SecurityViolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_chain(cert_sizes: &[usize]) -> Vec<u8> {
        let mut chain = Vec::new();
        for size in cert_sizes {
            let body_len = size - 4;
            chain.push(0x30);
            chain.push(0x82);
            chain.push((body_len >> 8) as u8);
            chain.push((body_len & 0xff) as u8);
            chain.extend(core::iter::repeat(0xcc).take(body_len));
        }
        chain
    }

    #[test]
    fn test_case0_cert_from_cert_chain() {
        let chain = synthetic_chain(&[300, 400, 500]);
        assert_eq!(get_cert_from_cert_chain(&chain, 0).unwrap(), (0, 300));
        assert_eq!(get_cert_from_cert_chain(&chain, 1).unwrap(), (300, 700));
        assert_eq!(get_cert_from_cert_chain(&chain, 2).unwrap(), (700, 1200));
        assert_eq!(get_cert_from_cert_chain(&chain, -1).unwrap(), (700, 1200));
    }

    #[test]
    fn test_case1_bad_prefix_rejected() {
        let mut chain = synthetic_chain(&[300]);
        chain[0] = 0x00;
        assert!(get_cert_from_cert_chain(&chain, 0).is_err());
    }

    #[test]
    fn test_case2_truncated_chain_rejected() {
        let mut chain = synthetic_chain(&[300]);
        chain.truncate(200);
        assert!(get_cert_from_cert_chain(&chain, 0).is_err());
    }

    #[test]
    fn test_case3_split_matches_walk() {
        let chain = synthetic_chain(&[256, 512]);
        let certs = split_cert_chain(&chain).unwrap();
        assert_eq!(certs.len(), 2);
        assert_eq!(certs[0].len(), 256);
        assert_eq!(certs[1].len(), 512);
    }
}
