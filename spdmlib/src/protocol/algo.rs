// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::config;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};
use zeroize::Zeroize;

pub const SPDM_NONCE_SIZE: usize = 32;
pub const SPDM_RANDOM_SIZE: usize = 32;
pub const SPDM_MAX_HASH_SIZE: usize = 64;
pub const SPDM_MAX_ASYM_KEY_SIZE: usize = 512;
pub const SPDM_MAX_DHE_KEY_SIZE: usize = 96;
pub const SPDM_MAX_DHE_FINAL_KEY_SIZE: usize = 64;
pub const SPDM_MAX_AEAD_KEY_SIZE: usize = 32;
pub const SPDM_MAX_AEAD_IV_SIZE: usize = 12;
pub const SPDM_MAX_AEAD_TAG_SIZE: usize = 16;

bitflags! {
    #[derive(Default)]
    pub struct SpdmMeasurementSpecification: u8 {
        const DMTF = 0b0000_0001;
    }
}

impl Codec for SpdmMeasurementSpecification {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementSpecification> {
        let bits = u8::read(r)?;
        SpdmMeasurementSpecification::from_bits(bits)
    }
}

impl SpdmMeasurementSpecification {
    /// Keep the strongest (highest) member of the intersection.
    pub fn prioritize(&mut self, peer: SpdmMeasurementSpecification) {
        let both = *self & peer;
        *self = Self::highest_bit(both.bits())
            .map_or_else(SpdmMeasurementSpecification::empty, |bit| {
                SpdmMeasurementSpecification::from_bits_truncate(bit)
            });
    }

    fn highest_bit(bits: u8) -> Option<u8> {
        if bits == 0 {
            None
        } else {
            Some(1u8 << (7 - bits.leading_zeros()))
        }
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmBaseHashAlgo: u32 {
        const TPM_ALG_SHA_256 = 0b0000_0001;
        const TPM_ALG_SHA_384 = 0b0000_0010;
        const TPM_ALG_SHA_512 = 0b0000_0100;
    }
}

impl SpdmBaseHashAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmBaseHashAlgo::TPM_ALG_SHA_256 => 32,
            SpdmBaseHashAlgo::TPM_ALG_SHA_384 => 48,
            SpdmBaseHashAlgo::TPM_ALG_SHA_512 => 64,
            _ => 0,
        }
    }
}

impl Codec for SpdmBaseHashAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmBaseHashAlgo> {
        let bits = u32::read(r)?;
        SpdmBaseHashAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmMeasurementHashAlgo: u32 {
        const RAW_BIT_STREAM = 0b0000_0001;
        const TPM_ALG_SHA_256 = 0b0000_0010;
        const TPM_ALG_SHA_384 = 0b0000_0100;
        const TPM_ALG_SHA_512 = 0b0000_1000;
    }
}

impl SpdmMeasurementHashAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmMeasurementHashAlgo::RAW_BIT_STREAM => 0,
            SpdmMeasurementHashAlgo::TPM_ALG_SHA_256 => 32,
            SpdmMeasurementHashAlgo::TPM_ALG_SHA_384 => 48,
            SpdmMeasurementHashAlgo::TPM_ALG_SHA_512 => 64,
            _ => 0,
        }
    }
}

impl Codec for SpdmMeasurementHashAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementHashAlgo> {
        let bits = u32::read(r)?;
        SpdmMeasurementHashAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmBaseAsymAlgo: u32 {
        const TPM_ALG_RSASSA_2048 = 0b0000_0001;
        const TPM_ALG_RSAPSS_2048 = 0b0000_0010;
        const TPM_ALG_RSASSA_3072 = 0b0000_0100;
        const TPM_ALG_RSAPSS_3072 = 0b0000_1000;
        const TPM_ALG_ECDSA_ECC_NIST_P256 = 0b0001_0000;
        const TPM_ALG_RSASSA_4096 = 0b0010_0000;
        const TPM_ALG_RSAPSS_4096 = 0b0100_0000;
        const TPM_ALG_ECDSA_ECC_NIST_P384 = 0b1000_0000;
    }
}

impl SpdmBaseAsymAlgo {
    /// Signature size on the wire.
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmBaseAsymAlgo::TPM_ALG_RSASSA_2048 | SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_2048 => 256,
            SpdmBaseAsymAlgo::TPM_ALG_RSASSA_3072 | SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_3072 => 384,
            SpdmBaseAsymAlgo::TPM_ALG_RSASSA_4096 | SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_4096 => 512,
            SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P256 => 64,
            SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384 => 96,
            _ => 0,
        }
    }
}

impl Codec for SpdmBaseAsymAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmBaseAsymAlgo> {
        let bits = u32::read(r)?;
        SpdmBaseAsymAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmReqAsymAlgo: u16 {
        const TPM_ALG_RSASSA_2048 = 0b0000_0001;
        const TPM_ALG_RSAPSS_2048 = 0b0000_0010;
        const TPM_ALG_RSASSA_3072 = 0b0000_0100;
        const TPM_ALG_RSAPSS_3072 = 0b0000_1000;
        const TPM_ALG_ECDSA_ECC_NIST_P256 = 0b0001_0000;
        const TPM_ALG_RSASSA_4096 = 0b0010_0000;
        const TPM_ALG_RSAPSS_4096 = 0b0100_0000;
        const TPM_ALG_ECDSA_ECC_NIST_P384 = 0b1000_0000;
    }
}

impl SpdmReqAsymAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmReqAsymAlgo::TPM_ALG_RSASSA_2048 | SpdmReqAsymAlgo::TPM_ALG_RSAPSS_2048 => 256,
            SpdmReqAsymAlgo::TPM_ALG_RSASSA_3072 | SpdmReqAsymAlgo::TPM_ALG_RSAPSS_3072 => 384,
            SpdmReqAsymAlgo::TPM_ALG_RSASSA_4096 | SpdmReqAsymAlgo::TPM_ALG_RSAPSS_4096 => 512,
            SpdmReqAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P256 => 64,
            SpdmReqAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384 => 96,
            _ => 0,
        }
    }

    /// The same algorithm expressed in the base-asym bit positions, for
    /// verification paths shared with the responder identity.
    pub fn to_base_asym(self) -> SpdmBaseAsymAlgo {
        SpdmBaseAsymAlgo::from_bits_truncate(self.bits() as u32)
    }
}

impl Codec for SpdmReqAsymAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmReqAsymAlgo> {
        let bits = u16::read(r)?;
        SpdmReqAsymAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmDheAlgo: u16 {
        const FFDHE_2048 = 0b0000_0001;
        const FFDHE_3072 = 0b0000_0010;
        const FFDHE_4096 = 0b0000_0100;
        const SECP_256_R1 = 0b0000_1000;
        const SECP_384_R1 = 0b0001_0000;
        const SECP_521_R1 = 0b0010_0000;
    }
}

impl SpdmDheAlgo {
    /// Exchange-data size on the wire (X || Y for the ECC groups).
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmDheAlgo::FFDHE_2048 => 256,
            SpdmDheAlgo::FFDHE_3072 => 384,
            SpdmDheAlgo::FFDHE_4096 => 512,
            SpdmDheAlgo::SECP_256_R1 => 64,
            SpdmDheAlgo::SECP_384_R1 => 96,
            SpdmDheAlgo::SECP_521_R1 => 132,
            _ => 0,
        }
    }

    pub fn get_final_key_size(&self) -> u16 {
        match *self {
            SpdmDheAlgo::SECP_256_R1 => 32,
            SpdmDheAlgo::SECP_384_R1 => 48,
            SpdmDheAlgo::SECP_521_R1 => 66,
            _ => self.get_size(),
        }
    }
}

impl Codec for SpdmDheAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmDheAlgo> {
        let bits = u16::read(r)?;
        SpdmDheAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmAeadAlgo: u16 {
        const AES_128_GCM = 0b0000_0001;
        const AES_256_GCM = 0b0000_0010;
        const CHACHA20_POLY1305 = 0b0000_0100;
    }
}

impl SpdmAeadAlgo {
    pub fn get_key_size(&self) -> u16 {
        match *self {
            SpdmAeadAlgo::AES_128_GCM => 16,
            SpdmAeadAlgo::AES_256_GCM => 32,
            SpdmAeadAlgo::CHACHA20_POLY1305 => 32,
            _ => 0,
        }
    }

    pub fn get_iv_size(&self) -> u16 {
        match *self {
            SpdmAeadAlgo::AES_128_GCM
            | SpdmAeadAlgo::AES_256_GCM
            | SpdmAeadAlgo::CHACHA20_POLY1305 => 12,
            _ => 0,
        }
    }

    pub fn get_tag_size(&self) -> u16 {
        match *self {
            SpdmAeadAlgo::AES_128_GCM
            | SpdmAeadAlgo::AES_256_GCM
            | SpdmAeadAlgo::CHACHA20_POLY1305 => 16,
            _ => 0,
        }
    }
}

impl Codec for SpdmAeadAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmAeadAlgo> {
        let bits = u16::read(r)?;
        SpdmAeadAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmKeyScheduleAlgo: u16 {
        const SPDM_KEY_SCHEDULE = 0b0000_0001;
    }
}

impl Codec for SpdmKeyScheduleAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmKeyScheduleAlgo> {
        let bits = u16::read(r)?;
        SpdmKeyScheduleAlgo::from_bits(bits)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpdmNonceStruct {
    pub data: [u8; SPDM_NONCE_SIZE],
}

impl Default for SpdmNonceStruct {
    fn default() -> SpdmNonceStruct {
        SpdmNonceStruct {
            data: [0u8; SPDM_NONCE_SIZE],
        }
    }
}

impl Codec for SpdmNonceStruct {
    fn encode(&self, bytes: &mut Writer) {
        assert!(bytes.extend_from_slice(&self.data).is_some());
    }

    fn read(r: &mut Reader) -> Option<SpdmNonceStruct> {
        let raw = r.take(SPDM_NONCE_SIZE)?;
        let mut data = [0u8; SPDM_NONCE_SIZE];
        data.copy_from_slice(raw);
        Some(SpdmNonceStruct { data })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpdmRandomStruct {
    pub data: [u8; SPDM_RANDOM_SIZE],
}

impl Default for SpdmRandomStruct {
    fn default() -> SpdmRandomStruct {
        SpdmRandomStruct {
            data: [0u8; SPDM_RANDOM_SIZE],
        }
    }
}

impl Codec for SpdmRandomStruct {
    fn encode(&self, bytes: &mut Writer) {
        assert!(bytes.extend_from_slice(&self.data).is_some());
    }

    fn read(r: &mut Reader) -> Option<SpdmRandomStruct> {
        let raw = r.take(SPDM_RANDOM_SIZE)?;
        let mut data = [0u8; SPDM_RANDOM_SIZE];
        data.copy_from_slice(raw);
        Some(SpdmRandomStruct { data })
    }
}

/// A digest, HMAC, or HKDF-derived secret sized by the negotiated hash.
#[derive(Debug, Clone, Copy, Zeroize)]
pub struct SpdmDigestStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_HASH_SIZE],
}

impl Default for SpdmDigestStruct {
    fn default() -> SpdmDigestStruct {
        SpdmDigestStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_HASH_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmDigestStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmDigestStruct {
    pub fn from_data(data: &[u8]) -> SpdmDigestStruct {
        let mut digest = SpdmDigestStruct {
            data_size: data.len() as u16,
            ..Default::default()
        };
        digest.data[..data.len()].copy_from_slice(data);
        digest
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpdmSignatureStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_ASYM_KEY_SIZE],
}

impl Default for SpdmSignatureStruct {
    fn default() -> SpdmSignatureStruct {
        SpdmSignatureStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_ASYM_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmSignatureStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpdmDheExchangeStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_DHE_KEY_SIZE],
}

impl Default for SpdmDheExchangeStruct {
    fn default() -> SpdmDheExchangeStruct {
        SpdmDheExchangeStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_DHE_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmDheExchangeStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmDheExchangeStruct {
    pub fn from_data(data: &[u8]) -> SpdmDheExchangeStruct {
        let mut exchange = SpdmDheExchangeStruct {
            data_size: data.len() as u16,
            ..Default::default()
        };
        exchange.data[..data.len()].copy_from_slice(data);
        exchange
    }
}

/// A DHE shared secret or an imported PSK, the IKM of the key schedule.
#[derive(Debug, Clone, Copy, Zeroize)]
pub struct SpdmDheFinalKeyStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_DHE_FINAL_KEY_SIZE],
}

impl Default for SpdmDheFinalKeyStruct {
    fn default() -> SpdmDheFinalKeyStruct {
        SpdmDheFinalKeyStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_DHE_FINAL_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmDheFinalKeyStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmDheFinalKeyStruct {
    pub fn from_data(data: &[u8]) -> SpdmDheFinalKeyStruct {
        let mut key = SpdmDheFinalKeyStruct {
            data_size: data.len() as u16,
            ..Default::default()
        };
        key.data[..data.len()].copy_from_slice(data);
        key
    }
}

#[derive(Debug, Clone, Copy, Zeroize)]
pub struct SpdmAeadKeyStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_AEAD_KEY_SIZE],
}

impl Default for SpdmAeadKeyStruct {
    fn default() -> SpdmAeadKeyStruct {
        SpdmAeadKeyStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_AEAD_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmAeadKeyStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Clone, Copy, Zeroize)]
pub struct SpdmAeadIvStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_AEAD_IV_SIZE],
}

impl Default for SpdmAeadIvStruct {
    fn default() -> SpdmAeadIvStruct {
        SpdmAeadIvStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_AEAD_IV_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmAeadIvStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Clone, Copy, Zeroize)]
pub struct SpdmPskStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_PSK_SIZE],
}

impl Default for SpdmPskStruct {
    fn default() -> SpdmPskStruct {
        SpdmPskStruct {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_PSK_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmPskStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

/// Raw DER certificate chain as provisioned or reassembled from chunks.
#[derive(Debug, Clone, Copy)]
pub struct SpdmCertChainData {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_CERT_CHAIN_DATA_SIZE],
}

impl Default for SpdmCertChainData {
    fn default() -> SpdmCertChainData {
        SpdmCertChainData {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_CERT_CHAIN_DATA_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmCertChainData {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

/// The wire form of a certificate chain slot: `length(2) || reserved(2) ||
/// root_hash || DER chain`.
#[derive(Debug, Clone, Copy)]
pub struct SpdmCertChainBuffer {
    pub data_size: u16,
    pub data: [u8; 4 + SPDM_MAX_HASH_SIZE + config::MAX_SPDM_CERT_CHAIN_DATA_SIZE],
}

impl Default for SpdmCertChainBuffer {
    fn default() -> SpdmCertChainBuffer {
        SpdmCertChainBuffer {
            data_size: 0,
            data: [0u8; 4 + SPDM_MAX_HASH_SIZE + config::MAX_SPDM_CERT_CHAIN_DATA_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmCertChainBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmCertChainBuffer {
    pub fn new(cert_chain: &[u8], root_hash: &[u8]) -> Option<SpdmCertChainBuffer> {
        let total = 4 + root_hash.len() + cert_chain.len();
        let mut buffer = SpdmCertChainBuffer::default();
        if total > buffer.data.len() || total > u16::MAX as usize {
            return None;
        }
        buffer.data[0..2].copy_from_slice(&(total as u16).to_le_bytes());
        buffer.data[4..4 + root_hash.len()].copy_from_slice(root_hash);
        buffer.data[4 + root_hash.len()..total].copy_from_slice(cert_chain);
        buffer.data_size = total as u16;
        Some(buffer)
    }
}

enum_builder! {
    @U8
    EnumName: SpdmDmtfMeasurementType;
    EnumVal{
        SpdmDmtfMeasurementRom => 0x0,
        SpdmDmtfMeasurementFirmware => 0x1,
        SpdmDmtfMeasurementHardwareConfig => 0x2,
        SpdmDmtfMeasurementFirmwareConfig => 0x3,
        SpdmDmtfMeasurementManifest => 0x4
    }
}

enum_builder! {
    @U8
    EnumName: SpdmDmtfMeasurementRepresentation;
    EnumVal{
        SpdmDmtfMeasurementDigest => 0x0,
        SpdmDmtfMeasurementRawBit => 0x80
    }
}

/// A DMTF-format measurement value: `type|representation (1) || size (2) ||
/// value`.
#[derive(Debug, Clone, Copy)]
pub struct SpdmDmtfMeasurementStructure {
    pub r#type: SpdmDmtfMeasurementType,
    pub representation: SpdmDmtfMeasurementRepresentation,
    pub value_size: u16,
    pub value: [u8; config::MAX_SPDM_MEASUREMENT_VALUE_LEN],
}

impl Default for SpdmDmtfMeasurementStructure {
    fn default() -> SpdmDmtfMeasurementStructure {
        SpdmDmtfMeasurementStructure {
            r#type: SpdmDmtfMeasurementType::SpdmDmtfMeasurementRom,
            representation: SpdmDmtfMeasurementRepresentation::SpdmDmtfMeasurementDigest,
            value_size: 0,
            value: [0u8; config::MAX_SPDM_MEASUREMENT_VALUE_LEN],
        }
    }
}

impl Codec for SpdmDmtfMeasurementStructure {
    fn encode(&self, bytes: &mut Writer) {
        (self.r#type.get_u8() | self.representation.get_u8()).encode(bytes);
        self.value_size.encode(bytes);
        assert!(bytes
            .extend_from_slice(&self.value[..self.value_size as usize])
            .is_some());
    }

    fn read(r: &mut Reader) -> Option<SpdmDmtfMeasurementStructure> {
        let type_byte = u8::read(r)?;
        let r#type = match type_byte & 0x7f {
            0 => SpdmDmtfMeasurementType::SpdmDmtfMeasurementRom,
            1 => SpdmDmtfMeasurementType::SpdmDmtfMeasurementFirmware,
            2 => SpdmDmtfMeasurementType::SpdmDmtfMeasurementHardwareConfig,
            3 => SpdmDmtfMeasurementType::SpdmDmtfMeasurementFirmwareConfig,
            4 => SpdmDmtfMeasurementType::SpdmDmtfMeasurementManifest,
            x => SpdmDmtfMeasurementType::Unknown(x),
        };
        let representation = if type_byte & 0x80 != 0 {
            SpdmDmtfMeasurementRepresentation::SpdmDmtfMeasurementRawBit
        } else {
            SpdmDmtfMeasurementRepresentation::SpdmDmtfMeasurementDigest
        };
        let value_size = u16::read(r)?;
        if value_size as usize > config::MAX_SPDM_MEASUREMENT_VALUE_LEN {
            return None;
        }
        let raw = r.take(value_size as usize)?;
        let mut value = [0u8; config::MAX_SPDM_MEASUREMENT_VALUE_LEN];
        value[..value_size as usize].copy_from_slice(raw);
        Some(SpdmDmtfMeasurementStructure {
            r#type,
            representation,
            value_size,
            value,
        })
    }
}

/// One measurement block: `index (1) || spec (1) || size (2) || DMTF value`.
#[derive(Debug, Clone, Copy)]
pub struct SpdmMeasurementBlockStructure {
    pub index: u8,
    pub measurement_specification: SpdmMeasurementSpecification,
    pub measurement_size: u16,
    pub measurement: SpdmDmtfMeasurementStructure,
}

impl Default for SpdmMeasurementBlockStructure {
    fn default() -> SpdmMeasurementBlockStructure {
        SpdmMeasurementBlockStructure {
            index: 0,
            measurement_specification: SpdmMeasurementSpecification::default(),
            measurement_size: 0,
            measurement: SpdmDmtfMeasurementStructure::default(),
        }
    }
}

impl SpdmMeasurementBlockStructure {
    pub fn wire_size(&self) -> u32 {
        4 + 3 + self.measurement.value_size as u32
    }
}

impl Codec for SpdmMeasurementBlockStructure {
    fn encode(&self, bytes: &mut Writer) {
        self.index.encode(bytes);
        self.measurement_specification.encode(bytes);
        self.measurement_size.encode(bytes);
        self.measurement.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementBlockStructure> {
        let index = u8::read(r)?;
        let measurement_specification = SpdmMeasurementSpecification::read(r)?;
        let measurement_size = u16::read(r)?;
        let measurement = SpdmDmtfMeasurementStructure::read(r)?;
        if measurement_size != 3 + measurement.value_size {
            return None;
        }
        Some(SpdmMeasurementBlockStructure {
            index,
            measurement_specification,
            measurement_size,
            measurement,
        })
    }
}

/// A set of measurement blocks: `count (1) || record_length (3) || blocks`.
#[derive(Debug, Clone, Copy)]
pub struct SpdmMeasurementRecordStructure {
    pub number_of_blocks: u8,
    pub record: [SpdmMeasurementBlockStructure; config::MAX_SPDM_MEASUREMENT_BLOCK_COUNT],
}

impl Default for SpdmMeasurementRecordStructure {
    fn default() -> SpdmMeasurementRecordStructure {
        SpdmMeasurementRecordStructure {
            number_of_blocks: 0,
            record: [SpdmMeasurementBlockStructure::default();
                config::MAX_SPDM_MEASUREMENT_BLOCK_COUNT],
        }
    }
}

impl Codec for SpdmMeasurementRecordStructure {
    fn encode(&self, bytes: &mut Writer) {
        self.number_of_blocks.encode(bytes);
        let mut record_length = 0u32;
        for block in self.record.iter().take(self.number_of_blocks as usize) {
            record_length += block.wire_size();
        }
        codec::u24(record_length).encode(bytes);
        for block in self.record.iter().take(self.number_of_blocks as usize) {
            block.encode(bytes);
        }
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementRecordStructure> {
        let number_of_blocks = u8::read(r)?;
        if number_of_blocks as usize > config::MAX_SPDM_MEASUREMENT_BLOCK_COUNT {
            return None;
        }
        let record_length = codec::u24::read(r)?.get();
        let mut record =
            [SpdmMeasurementBlockStructure::default(); config::MAX_SPDM_MEASUREMENT_BLOCK_COUNT];
        let mut parsed = 0u32;
        for slot in record.iter_mut().take(number_of_blocks as usize) {
            *slot = SpdmMeasurementBlockStructure::read(r)?;
            parsed += slot.wire_size();
        }
        if parsed != record_length {
            return None;
        }
        Some(SpdmMeasurementRecordStructure {
            number_of_blocks,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_algo_sizes() {
        assert_eq!(SpdmBaseHashAlgo::TPM_ALG_SHA_384.get_size(), 48);
        assert_eq!(
            SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384.get_size(),
            96
        );
        assert_eq!(SpdmDheAlgo::SECP_384_R1.get_size(), 96);
        assert_eq!(SpdmDheAlgo::SECP_384_R1.get_final_key_size(), 48);
        assert_eq!(SpdmAeadAlgo::AES_256_GCM.get_key_size(), 32);
        assert_eq!(SpdmAeadAlgo::AES_256_GCM.get_iv_size(), 12);
        assert_eq!(SpdmAeadAlgo::AES_256_GCM.get_tag_size(), 16);
        assert_eq!(SpdmBaseHashAlgo::default().get_size(), 0);
    }

    #[test]
    fn test_case0_measurement_record_round_trip() {
        let mut block = SpdmMeasurementBlockStructure {
            index: 1,
            measurement_specification: SpdmMeasurementSpecification::DMTF,
            measurement_size: 3 + 48,
            measurement: SpdmDmtfMeasurementStructure {
                r#type: SpdmDmtfMeasurementType::SpdmDmtfMeasurementFirmware,
                representation: SpdmDmtfMeasurementRepresentation::SpdmDmtfMeasurementDigest,
                value_size: 48,
                value: [0x5au8; config::MAX_SPDM_MEASUREMENT_VALUE_LEN],
            },
        };
        block.measurement.value[47] = 0xa5;

        let mut value = SpdmMeasurementRecordStructure {
            number_of_blocks: 2,
            ..Default::default()
        };
        value.record[0] = block;
        block.index = 2;
        value.record[1] = block;

        let u8_slice = &mut [0u8; 256];
        let mut writer = Writer::init(u8_slice);
        value.encode(&mut writer);
        let used = writer.used();
        assert_eq!(used, 1 + 3 + 2 * (4 + 3 + 48));

        let mut reader = Reader::init(&u8_slice[..used]);
        let record = SpdmMeasurementRecordStructure::read(&mut reader).unwrap();
        assert_eq!(record.number_of_blocks, 2);
        assert_eq!(record.record[0].index, 1);
        assert_eq!(record.record[1].index, 2);
        assert_eq!(record.record[0].measurement.value_size, 48);
        assert_eq!(record.record[0].measurement.value[47], 0xa5);
    }

    #[test]
    fn test_case1_measurement_record_length_mismatch() {
        let mut value = SpdmMeasurementRecordStructure {
            number_of_blocks: 1,
            ..Default::default()
        };
        value.record[0] = SpdmMeasurementBlockStructure {
            index: 1,
            measurement_specification: SpdmMeasurementSpecification::DMTF,
            measurement_size: 3 + 4,
            measurement: SpdmDmtfMeasurementStructure {
                value_size: 4,
                ..Default::default()
            },
        };

        let u8_slice = &mut [0u8; 64];
        let mut writer = Writer::init(u8_slice);
        value.encode(&mut writer);
        // corrupt the record length counter
        u8_slice[1] = u8_slice[1].wrapping_add(1);
        let mut reader = Reader::init(u8_slice);
        assert!(SpdmMeasurementRecordStructure::read(&mut reader).is_none());
    }

    #[test]
    fn test_case0_cert_chain_buffer_layout() {
        let chain = [0x30u8; 64];
        let hash = [0x11u8; 48];
        let buffer = SpdmCertChainBuffer::new(&chain, &hash).unwrap();
        assert_eq!(buffer.data_size as usize, 4 + 48 + 64);
        assert_eq!(&buffer.data[0..2], &(116u16).to_le_bytes());
        assert_eq!(&buffer.data[4..8], &[0x11, 0x11, 0x11, 0x11]);
        assert_eq!(buffer.data[4 + 48], 0x30);
    }
}
