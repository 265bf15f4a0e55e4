// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto::SpdmAsymVerify;
use crate::error::SpdmResult;
use crate::protocol::{SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SpdmSignatureStruct};
use crate::{spdm_err, spdm_result_err};

pub static DEFAULT: SpdmAsymVerify = SpdmAsymVerify { verify_cb: verify };

fn verify(
    base_hash_algo: SpdmBaseHashAlgo,
    base_asym_algo: SpdmBaseAsymAlgo,
    public_cert_der: &[u8],
    data: &[u8],
    signature: &SpdmSignatureStruct,
) -> SpdmResult {
    if signature.data_size != base_asym_algo.get_size() {
        return spdm_result_err!(InvalidParameter);
    }

    let algorithm: &'static dyn ring::signature::VerificationAlgorithm =
        match (base_asym_algo, base_hash_algo) {
            (
                SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P256,
                SpdmBaseHashAlgo::TPM_ALG_SHA_256,
            ) => &ring::signature::ECDSA_P256_SHA256_FIXED,
            (
                SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384,
                SpdmBaseHashAlgo::TPM_ALG_SHA_384,
            ) => &ring::signature::ECDSA_P384_SHA384_FIXED,
            (SpdmBaseAsymAlgo::TPM_ALG_RSASSA_2048, hash)
            | (SpdmBaseAsymAlgo::TPM_ALG_RSASSA_3072, hash)
            | (SpdmBaseAsymAlgo::TPM_ALG_RSASSA_4096, hash) => match hash {
                SpdmBaseHashAlgo::TPM_ALG_SHA_256 => &ring::signature::RSA_PKCS1_2048_8192_SHA256,
                SpdmBaseHashAlgo::TPM_ALG_SHA_384 => &ring::signature::RSA_PKCS1_2048_8192_SHA384,
                SpdmBaseHashAlgo::TPM_ALG_SHA_512 => &ring::signature::RSA_PKCS1_2048_8192_SHA512,
                _ => return spdm_result_err!(Unsupported),
            },
            (SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_2048, hash)
            | (SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_3072, hash)
            | (SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_4096, hash) => match hash {
                SpdmBaseHashAlgo::TPM_ALG_SHA_256 => &ring::signature::RSA_PSS_2048_8192_SHA256,
                SpdmBaseHashAlgo::TPM_ALG_SHA_384 => &ring::signature::RSA_PSS_2048_8192_SHA384,
                SpdmBaseHashAlgo::TPM_ALG_SHA_512 => &ring::signature::RSA_PSS_2048_8192_SHA512,
                _ => return spdm_result_err!(Unsupported),
            },
            _ => return spdm_result_err!(Unsupported),
        };

    let (leaf_begin, leaf_end) =
        super::cert_operation_impl::get_cert_from_cert_chain(public_cert_der, -1)?;
    let leaf_cert = &public_cert_der[leaf_begin..leaf_end];
    let public_key =
        subject_public_key(leaf_cert).ok_or_else(|| spdm_err!(InvalidParameter))?;

    ring::signature::UnparsedPublicKey::new(algorithm, public_key)
        .verify(data, signature.as_ref())
        .map_err(|_| spdm_err!(SecurityViolation))
}

fn der_read_tlv<'a>(reader: &mut untrusted::Reader<'a>) -> Option<(u8, untrusted::Input<'a>)> {
    let tag = reader.read_byte().ok()?;
    let first = reader.read_byte().ok()?;
    let length = if first & 0x80 == 0 {
        first as usize
    } else {
        let byte_count = (first & 0x7f) as usize;
        // certificates here stay well under 64 KiB
        if byte_count == 0 || byte_count > 2 {
            return None;
        }
        let mut length = 0usize;
        for _ in 0..byte_count {
            length = (length << 8) | reader.read_byte().ok()? as usize;
        }
        length
    };
    let value = reader.read_bytes(length).ok()?;
    Some((tag, value))
}

/// Pull the SubjectPublicKeyInfo bit-string payload out of one DER
/// certificate: the uncompressed point for EC keys, the PKCS#1
/// RSAPublicKey for RSA keys.
fn subject_public_key(cert: &[u8]) -> Option<&[u8]> {
    let mut reader = untrusted::Reader::new(untrusted::Input::from(cert));
    let (tag, certificate) = der_read_tlv(&mut reader)?;
    if tag != 0x30 {
        return None;
    }
    let mut reader = untrusted::Reader::new(certificate);
    let (tag, tbs_certificate) = der_read_tlv(&mut reader)?;
    if tag != 0x30 {
        return None;
    }
    let mut tbs_reader = untrusted::Reader::new(tbs_certificate);
    if tbs_reader.peek(0xa0) {
        der_read_tlv(&mut tbs_reader)?; // [0] version
    }
    der_read_tlv(&mut tbs_reader)?; // serialNumber
    der_read_tlv(&mut tbs_reader)?; // signature
    der_read_tlv(&mut tbs_reader)?; // issuer
    der_read_tlv(&mut tbs_reader)?; // validity
    der_read_tlv(&mut tbs_reader)?; // subject
    let (tag, spki) = der_read_tlv(&mut tbs_reader)?;
    if tag != 0x30 {
        return None;
    }
    let mut spki_reader = untrusted::Reader::new(spki);
    der_read_tlv(&mut spki_reader)?; // AlgorithmIdentifier
    let (tag, bit_string) = der_read_tlv(&mut spki_reader)?;
    if tag != 0x03 {
        return None;
    }
    let bytes = bit_string.as_slice_less_safe();
    if bytes.is_empty() || bytes[0] != 0 {
        return None;
    }
    Some(&bytes[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_der_tlv_short_and_long_form() {
        let short = [0x02u8, 0x01, 0x07];
        let mut reader = untrusted::Reader::new(untrusted::Input::from(&short));
        let (tag, value) = der_read_tlv(&mut reader).unwrap();
        assert_eq!(tag, 0x02);
        assert_eq!(value.as_slice_less_safe(), &[0x07]);

        let mut long = [0u8; 4 + 300];
        long[0] = 0x30;
        long[1] = 0x82;
        long[2] = 0x01;
        long[3] = 0x2c; // 300
        let mut reader = untrusted::Reader::new(untrusted::Input::from(&long));
        let (tag, value) = der_read_tlv(&mut reader).unwrap();
        assert_eq!(tag, 0x30);
        assert_eq!(value.len(), 300);
    }

    #[test]
    fn test_case1_truncated_tlv_rejected() {
        let truncated = [0x30u8, 0x05, 0x01];
        let mut reader = untrusted::Reader::new(untrusted::Input::from(&truncated));
        assert!(der_read_tlv(&mut reader).is_none());
    }
}
