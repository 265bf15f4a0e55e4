// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::protocol::{
    SpdmAeadAlgo, SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SpdmDheAlgo, SpdmKeyScheduleAlgo,
    SpdmMeasurementHashAlgo, SpdmMeasurementSpecification, SpdmReqAsymAlgo,
};
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

pub const MAX_SPDM_ALG_STRUCT_COUNT: usize = 4;

enum_builder! {
    @U8
    EnumName: SpdmAlgType;
    EnumVal{
        SpdmAlgTypeDHE => 0x2,
        SpdmAlgTypeAEAD => 0x3,
        SpdmAlgTypeReqAsym => 0x4,
        SpdmAlgTypeKeySchedule => 0x5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmAlg {
    SpdmAlgoDhe(SpdmDheAlgo),
    SpdmAlgoAead(SpdmAeadAlgo),
    SpdmAlgoReqAsym(SpdmReqAsymAlgo),
    SpdmAlgoKeySchedule(SpdmKeyScheduleAlgo),
    SpdmAlgoUnknown(u16),
}

impl SpdmAlg {
    pub fn get_u16(&self) -> u16 {
        match self {
            SpdmAlg::SpdmAlgoDhe(alg) => alg.bits(),
            SpdmAlg::SpdmAlgoAead(alg) => alg.bits(),
            SpdmAlg::SpdmAlgoReqAsym(alg) => alg.bits(),
            SpdmAlg::SpdmAlgoKeySchedule(alg) => alg.bits(),
            SpdmAlg::SpdmAlgoUnknown(raw) => *raw,
        }
    }
}

impl Default for SpdmAlg {
    fn default() -> SpdmAlg {
        SpdmAlg::SpdmAlgoUnknown(0)
    }
}

/// One self-describing `reqalg_struct` table entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmAlgStruct {
    pub alg_type: SpdmAlgType,
    pub alg_fixed_count: u8,
    pub alg_ext_count: u8,
    pub alg_supported: SpdmAlg,
}

impl SpdmAlgStruct {
    pub fn wire_size(&self) -> usize {
        2 + self.alg_fixed_count as usize + 4 * self.alg_ext_count as usize
    }
}

impl Codec for SpdmAlgStruct {
    fn encode(&self, bytes: &mut Writer) {
        self.alg_type.encode(bytes);
        ((self.alg_fixed_count << 4) | self.alg_ext_count).encode(bytes);
        self.alg_supported.get_u16().encode(bytes);
        for _ in 0..self.alg_ext_count {
            0u32.encode(bytes);
        }
    }

    fn read(r: &mut Reader) -> Option<SpdmAlgStruct> {
        let alg_type = SpdmAlgType::read(r)?;
        let count = u8::read(r)?;
        let alg_fixed_count = count >> 4;
        let alg_ext_count = count & 0xf;
        if alg_fixed_count != 2 {
            return None;
        }
        let raw = u16::read(r)?;
        let alg_supported = match alg_type {
            SpdmAlgType::SpdmAlgTypeDHE => SpdmAlg::SpdmAlgoDhe(SpdmDheAlgo::from_bits(raw)?),
            SpdmAlgType::SpdmAlgTypeAEAD => SpdmAlg::SpdmAlgoAead(SpdmAeadAlgo::from_bits(raw)?),
            SpdmAlgType::SpdmAlgTypeReqAsym => {
                SpdmAlg::SpdmAlgoReqAsym(SpdmReqAsymAlgo::from_bits(raw)?)
            }
            SpdmAlgType::SpdmAlgTypeKeySchedule => {
                SpdmAlg::SpdmAlgoKeySchedule(SpdmKeyScheduleAlgo::from_bits(raw)?)
            }
            SpdmAlgType::Unknown(_) => SpdmAlg::SpdmAlgoUnknown(raw),
        };
        for _ in 0..alg_ext_count {
            u32::read(r)?;
        }
        Some(SpdmAlgStruct {
            alg_type,
            alg_fixed_count,
            alg_ext_count,
            alg_supported,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmNegotiateAlgorithmsRequestPayload {
    pub measurement_specification: SpdmMeasurementSpecification,
    pub base_asym_algo: SpdmBaseAsymAlgo,
    pub base_hash_algo: SpdmBaseHashAlgo,
    pub alg_struct_count: u8,
    pub alg_struct: [SpdmAlgStruct; MAX_SPDM_ALG_STRUCT_COUNT],
}

impl SpdmCodec for SpdmNegotiateAlgorithmsRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.alg_struct_count.encode(bytes); // param1
        0u8.encode(bytes); // param2
        let mut length: u16 = 32;
        for alg in self.alg_struct.iter().take(self.alg_struct_count as usize) {
            length += alg.wire_size() as u16;
        }
        length.encode(bytes);
        self.measurement_specification.encode(bytes);
        0u8.encode(bytes); // reserved
        self.base_asym_algo.encode(bytes);
        self.base_hash_algo.encode(bytes);
        for _ in 0..12 {
            0u8.encode(bytes); // reserved
        }
        0u8.encode(bytes); // ext_asym_count
        0u8.encode(bytes); // ext_hash_count
        0u16.encode(bytes); // reserved2
        for alg in self.alg_struct.iter().take(self.alg_struct_count as usize) {
            alg.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmNegotiateAlgorithmsRequestPayload> {
        let alg_struct_count = u8::read(r)?; // param1
        if alg_struct_count as usize > MAX_SPDM_ALG_STRUCT_COUNT {
            return None;
        }
        u8::read(r)?; // param2
        let length = u16::read(r)?;
        let measurement_specification = SpdmMeasurementSpecification::read(r)?;
        u8::read(r)?; // reserved
        let base_asym_algo = SpdmBaseAsymAlgo::read(r)?;
        let base_hash_algo = SpdmBaseHashAlgo::read(r)?;
        for _ in 0..12 {
            u8::read(r)?; // reserved
        }
        let ext_asym_count = u8::read(r)?;
        let ext_hash_count = u8::read(r)?;
        u16::read(r)?; // reserved2
        for _ in 0..(4 * (ext_asym_count as usize + ext_hash_count as usize)) {
            u8::read(r)?;
        }

        let mut alg_struct = [SpdmAlgStruct::default(); MAX_SPDM_ALG_STRUCT_COUNT];
        let mut expected_length =
            32 + 4 * (ext_asym_count as usize + ext_hash_count as usize);
        for alg in alg_struct.iter_mut().take(alg_struct_count as usize) {
            *alg = SpdmAlgStruct::read(r)?;
            expected_length += alg.wire_size();
        }
        if length as usize != expected_length {
            return None;
        }
        Some(SpdmNegotiateAlgorithmsRequestPayload {
            measurement_specification,
            base_asym_algo,
            base_hash_algo,
            alg_struct_count,
            alg_struct,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmAlgorithmsResponsePayload {
    pub measurement_specification_sel: SpdmMeasurementSpecification,
    pub measurement_hash_algo: SpdmMeasurementHashAlgo,
    pub base_asym_sel: SpdmBaseAsymAlgo,
    pub base_hash_sel: SpdmBaseHashAlgo,
    pub alg_struct_count: u8,
    pub alg_struct: [SpdmAlgStruct; MAX_SPDM_ALG_STRUCT_COUNT],
}

impl SpdmCodec for SpdmAlgorithmsResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.alg_struct_count.encode(bytes); // param1
        0u8.encode(bytes); // param2
        let mut length: u16 = 36;
        for alg in self.alg_struct.iter().take(self.alg_struct_count as usize) {
            length += alg.wire_size() as u16;
        }
        length.encode(bytes);
        self.measurement_specification_sel.encode(bytes);
        0u8.encode(bytes); // reserved
        self.measurement_hash_algo.encode(bytes);
        self.base_asym_sel.encode(bytes);
        self.base_hash_sel.encode(bytes);
        for _ in 0..12 {
            0u8.encode(bytes); // reserved
        }
        0u8.encode(bytes); // ext_asym_sel_count
        0u8.encode(bytes); // ext_hash_sel_count
        0u16.encode(bytes); // reserved2
        for alg in self.alg_struct.iter().take(self.alg_struct_count as usize) {
            alg.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmAlgorithmsResponsePayload> {
        let alg_struct_count = u8::read(r)?; // param1
        if alg_struct_count as usize > MAX_SPDM_ALG_STRUCT_COUNT {
            return None;
        }
        u8::read(r)?; // param2
        let length = u16::read(r)?;
        let measurement_specification_sel = SpdmMeasurementSpecification::read(r)?;
        u8::read(r)?; // reserved
        let measurement_hash_algo = SpdmMeasurementHashAlgo::read(r)?;
        let base_asym_sel = SpdmBaseAsymAlgo::read(r)?;
        let base_hash_sel = SpdmBaseHashAlgo::read(r)?;
        for _ in 0..12 {
            u8::read(r)?; // reserved
        }
        let ext_asym_sel_count = u8::read(r)?;
        let ext_hash_sel_count = u8::read(r)?;
        u16::read(r)?; // reserved2
        for _ in 0..(4 * (ext_asym_sel_count as usize + ext_hash_sel_count as usize)) {
            u8::read(r)?;
        }

        let mut alg_struct = [SpdmAlgStruct::default(); MAX_SPDM_ALG_STRUCT_COUNT];
        let mut expected_length =
            36 + 4 * (ext_asym_sel_count as usize + ext_hash_sel_count as usize);
        for alg in alg_struct.iter_mut().take(alg_struct_count as usize) {
            *alg = SpdmAlgStruct::read(r)?;
            expected_length += alg.wire_size();
        }
        if length as usize != expected_length {
            return None;
        }
        Some(SpdmAlgorithmsResponsePayload {
            measurement_specification_sel,
            measurement_hash_algo,
            base_asym_sel,
            base_hash_sel,
            alg_struct_count,
            alg_struct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlib::*;

    fn request_alg_tables() -> [SpdmAlgStruct; MAX_SPDM_ALG_STRUCT_COUNT] {
        [
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeDHE,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoDhe(SpdmDheAlgo::SECP_384_R1),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeAEAD,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoAead(SpdmAeadAlgo::AES_256_GCM),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeReqAsym,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoReqAsym(
                    SpdmReqAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384,
                ),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeKeySchedule,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoKeySchedule(
                    SpdmKeyScheduleAlgo::SPDM_KEY_SCHEDULE,
                ),
            },
        ]
    }

    #[test]
    fn test_case0_spdm_negotiate_algorithms_request_payload() {
        let u8_slice = &mut [0u8; 64];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmNegotiateAlgorithmsRequestPayload {
            measurement_specification: SpdmMeasurementSpecification::DMTF,
            base_asym_algo: SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384,
            base_hash_algo: SpdmBaseHashAlgo::TPM_ALG_SHA_384,
            alg_struct_count: 4,
            alg_struct: request_alg_tables(),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 30 + 16);

        let mut reader = Reader::init(u8_slice);
        let request =
            SpdmNegotiateAlgorithmsRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.alg_struct_count, 4);
        assert_eq!(
            request.base_hash_algo,
            SpdmBaseHashAlgo::TPM_ALG_SHA_384
        );
        assert_eq!(
            request.alg_struct[0].alg_supported,
            SpdmAlg::SpdmAlgoDhe(SpdmDheAlgo::SECP_384_R1)
        );
    }

    #[test]
    fn test_case1_bad_length_sum_rejected() {
        let u8_slice = &mut [0u8; 64];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmNegotiateAlgorithmsRequestPayload {
            measurement_specification: SpdmMeasurementSpecification::DMTF,
            base_asym_algo: SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384,
            base_hash_algo: SpdmBaseHashAlgo::TPM_ALG_SHA_384,
            alg_struct_count: 4,
            alg_struct: request_alg_tables(),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        value.spdm_encode(&mut context, &mut writer);

        // corrupt the declared length
        u8_slice[2] = u8_slice[2].wrapping_add(1);
        let mut reader = Reader::init(u8_slice);
        assert!(
            SpdmNegotiateAlgorithmsRequestPayload::spdm_read(&mut context, &mut reader).is_none()
        );
    }

    #[test]
    fn test_case0_spdm_algorithms_response_payload() {
        let u8_slice = &mut [0u8; 64];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmAlgorithmsResponsePayload {
            measurement_specification_sel: SpdmMeasurementSpecification::DMTF,
            measurement_hash_algo: SpdmMeasurementHashAlgo::TPM_ALG_SHA_384,
            base_asym_sel: SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384,
            base_hash_sel: SpdmBaseHashAlgo::TPM_ALG_SHA_384,
            alg_struct_count: 4,
            alg_struct: request_alg_tables(),
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        let mut reader = Reader::init(u8_slice);
        let response =
            SpdmAlgorithmsResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(
            response.measurement_hash_algo,
            SpdmMeasurementHashAlgo::TPM_ALG_SHA_384
        );
        assert_eq!(
            response.alg_struct[1].alg_supported,
            SpdmAlg::SpdmAlgoAead(SpdmAeadAlgo::AES_256_GCM)
        );
    }
}
