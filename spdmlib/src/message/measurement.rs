// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::opaque::SpdmOpaqueStruct;
use crate::common::spdm_codec::SpdmCodec;
use crate::protocol::{
    SpdmMeasurementRecordStructure, SpdmNonceStruct, SpdmSignatureStruct,
};
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

pub const MEASUREMENT_RESPONDER_PARAM2_SLOT_ID_MASK: u8 = 0b0000_1111;
pub const MEASUREMENT_RESPONDER_PARAM2_CONTENT_CHANGED_MASK: u8 = 0b0011_0000;

bitflags! {
    #[derive(Default)]
    pub struct SpdmMeasurementAttributes: u8 {
        const SIGNATURE_REQUESTED = 0b0000_0001;
        const RAW_BIT_STREAM_REQUESTED = 0b0000_0010;
    }
}

impl Codec for SpdmMeasurementAttributes {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementAttributes> {
        let bits = u8::read(r)?;
        SpdmMeasurementAttributes::from_bits(bits)
    }
}

enum_builder! {
    @U8
    EnumName: SpdmMeasurementOperation;
    EnumVal{
        SpdmMeasurementQueryTotalNumber => 0x0,
        SpdmMeasurementRequestAll => 0xFF
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmGetMeasurementsRequestPayload {
    pub measurement_attributes: SpdmMeasurementAttributes,
    pub measurement_operation: SpdmMeasurementOperation,
    pub nonce: SpdmNonceStruct,
    pub slot_id: u8,
}

impl SpdmCodec for SpdmGetMeasurementsRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.measurement_attributes.encode(bytes); // param1
        self.measurement_operation.encode(bytes); // param2
        if self
            .measurement_attributes
            .contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED)
        {
            self.nonce.encode(bytes);
            self.slot_id.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetMeasurementsRequestPayload> {
        let measurement_attributes = SpdmMeasurementAttributes::read(r)?; // param1
        let measurement_operation = SpdmMeasurementOperation::read(r)?; // param2
        // the nonce/slot tail exists only on signed requests
        let mut nonce = SpdmNonceStruct::default();
        let mut slot_id = 0u8;
        if measurement_attributes.contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED) {
            nonce = SpdmNonceStruct::read(r)?;
            slot_id = u8::read(r)?;
        }

        Some(SpdmGetMeasurementsRequestPayload {
            measurement_attributes,
            measurement_operation,
            nonce,
            slot_id,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmMeasurementsResponsePayload {
    pub number_of_measurement: u8,
    pub slot_id: u8,
    pub content_changed: u8,
    pub measurement_record: SpdmMeasurementRecordStructure,
    pub nonce: SpdmNonceStruct,
    pub opaque: SpdmOpaqueStruct,
    pub signature: SpdmSignatureStruct,
}

impl SpdmCodec for SpdmMeasurementsResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        // param1 carries the total index count only when the request asked
        // for it (operation 0); otherwise the block count travels in the
        // record itself.
        self.number_of_measurement.encode(bytes); // param1
        (self.slot_id | self.content_changed).encode(bytes); // param2
        self.measurement_record.encode(bytes);
        self.nonce.encode(bytes);
        self.opaque.spdm_encode(context, bytes);
        if context.runtime_info.need_measurement_signature {
            self.signature.spdm_encode(context, bytes);
        }
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmMeasurementsResponsePayload> {
        let number_of_measurement = u8::read(r)?; // param1
        let param2 = u8::read(r)?; // param2
        let slot_id = param2 & MEASUREMENT_RESPONDER_PARAM2_SLOT_ID_MASK;
        let content_changed = param2 & MEASUREMENT_RESPONDER_PARAM2_CONTENT_CHANGED_MASK;
        let measurement_record = SpdmMeasurementRecordStructure::read(r)?;
        let nonce = SpdmNonceStruct::read(r)?;
        let opaque = SpdmOpaqueStruct::spdm_read(context, r)?;
        let signature = if context.runtime_info.need_measurement_signature {
            SpdmSignatureStruct::spdm_read(context, r)?
        } else {
            SpdmSignatureStruct::default()
        };
        Some(SpdmMeasurementsResponsePayload {
            number_of_measurement,
            slot_id,
            content_changed,
            measurement_record,
            nonce,
            opaque,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::protocol::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_measurement_attributes() {
        let u8_slice = &mut [0u8; 4];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmMeasurementAttributes::SIGNATURE_REQUESTED;
        value.encode(&mut writer);

        let mut reader = Reader::init(u8_slice);
        assert_eq!(
            SpdmMeasurementAttributes::read(&mut reader).unwrap(),
            SpdmMeasurementAttributes::SIGNATURE_REQUESTED
        );
    }

    #[test]
    fn test_case0_spdm_get_measurements_request_payload() {
        let u8_slice = &mut [0u8; 48];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmGetMeasurementsRequestPayload {
            measurement_attributes: SpdmMeasurementAttributes::SIGNATURE_REQUESTED,
            measurement_operation: SpdmMeasurementOperation::SpdmMeasurementRequestAll,
            nonce: SpdmNonceStruct {
                data: [100u8; SPDM_NONCE_SIZE],
            },
            slot_id: 0x7,
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2 + SPDM_NONCE_SIZE + 1);

        let mut reader = Reader::init(u8_slice);
        let get_measurements =
            SpdmGetMeasurementsRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(
            get_measurements.measurement_operation,
            SpdmMeasurementOperation::SpdmMeasurementRequestAll,
        );
        assert_eq!(get_measurements.slot_id, 0x7);
        for i in 0..SPDM_NONCE_SIZE {
            assert_eq!(get_measurements.nonce.data[i], 100u8);
        }
    }

    #[test]
    fn test_case1_nonce_absent_without_signature_request() {
        let u8_slice = &mut [0u8; 48];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmGetMeasurementsRequestPayload {
            measurement_attributes: SpdmMeasurementAttributes::empty(),
            measurement_operation: SpdmMeasurementOperation::SpdmMeasurementQueryTotalNumber,
            nonce: SpdmNonceStruct {
                data: [100u8; SPDM_NONCE_SIZE],
            },
            slot_id: 0x7,
        };

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), 2);
    }

    #[test]
    fn test_case0_spdm_measurements_response_payload() {
        let u8_slice = &mut [0u8; 1024];
        let mut writer = Writer::init(u8_slice);
        let mut block = SpdmMeasurementBlockStructure {
            index: 1,
            measurement_specification: SpdmMeasurementSpecification::DMTF,
            measurement_size: 3 + 48,
            measurement: SpdmDmtfMeasurementStructure {
                r#type: SpdmDmtfMeasurementType::SpdmDmtfMeasurementFirmware,
                representation: SpdmDmtfMeasurementRepresentation::SpdmDmtfMeasurementDigest,
                value_size: 48,
                value: [0x66u8; config::MAX_SPDM_MEASUREMENT_VALUE_LEN],
            },
        };
        let mut value = SpdmMeasurementsResponsePayload {
            number_of_measurement: 0,
            slot_id: 3,
            content_changed: 0,
            measurement_record: SpdmMeasurementRecordStructure {
                number_of_blocks: 2,
                ..Default::default()
            },
            nonce: SpdmNonceStruct {
                data: [0x99; SPDM_NONCE_SIZE],
            },
            opaque: SpdmOpaqueStruct::default(),
            signature: SpdmSignatureStruct {
                data_size: 96,
                data: [0x5a; SPDM_MAX_ASYM_KEY_SIZE],
            },
        };
        value.measurement_record.record[0] = block;
        block.index = 2;
        value.measurement_record.record[1] = block;

        let my_spdm_device_io = &mut MySpdmDeviceIo;
        let transport_encap = &mut TestTransportEncap;
        let mut context = new_context(my_spdm_device_io, transport_encap);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        context.negotiate_info.base_asym_sel = SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384;
        context.runtime_info.need_measurement_signature = true;

        value.spdm_encode(&mut context, &mut writer);
        let used = writer.used();

        let mut reader = Reader::init(&u8_slice[..used]);
        let measurements =
            SpdmMeasurementsResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(measurements.slot_id, 3);
        assert_eq!(measurements.measurement_record.number_of_blocks, 2);
        assert_eq!(measurements.measurement_record.record[1].index, 2);
        assert_eq!(measurements.signature.data_size, 96);

        // without the signature request the tail shrinks by the signature
        context.runtime_info.need_measurement_signature = false;
        let mut writer = Writer::init(u8_slice);
        value.signature = SpdmSignatureStruct::default();
        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(writer.used(), used - 96);
    }
}
