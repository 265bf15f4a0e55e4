// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Responder-owned secrets that are not keys: the measurement store.
//! Firmware registers a provider; the engine never invents measurements.

use crate::protocol::{
    SpdmBaseHashAlgo, SpdmDigestStruct, SpdmMeasurementHashAlgo, SpdmMeasurementRecordStructure,
    SpdmMeasurementSpecification, SpdmVersion,
};

#[derive(Clone)]
pub struct SpdmSecretMeasurement {
    /// `measurement_index` follows the GET_MEASUREMENTS operation field:
    /// 0 asks for the total count (returned in `number_of_blocks` with an
    /// empty record), 0xFF for every block, anything else for one block.
    pub measurement_collection_cb: fn(
        spdm_version: SpdmVersion,
        measurement_specification: SpdmMeasurementSpecification,
        measurement_hash_algo: SpdmMeasurementHashAlgo,
        measurement_index: usize,
    ) -> Option<SpdmMeasurementRecordStructure>,

    pub generate_measurement_summary_hash_cb: fn(
        spdm_version: SpdmVersion,
        base_hash_algo: SpdmBaseHashAlgo,
        measurement_specification: SpdmMeasurementSpecification,
        measurement_hash_algo: SpdmMeasurementHashAlgo,
        measurement_summary_hash_type: u8,
    ) -> Option<SpdmDigestStruct>,
}

pub mod measurement {
    use super::SpdmSecretMeasurement;
    use crate::protocol::{
        SpdmBaseHashAlgo, SpdmDigestStruct, SpdmMeasurementHashAlgo,
        SpdmMeasurementRecordStructure, SpdmMeasurementSpecification, SpdmVersion,
    };
    use conquer_once::spin::OnceCell;

    static SECRET_MEASUREMENT: OnceCell<SpdmSecretMeasurement> = OnceCell::uninit();

    pub fn register(context: SpdmSecretMeasurement) -> bool {
        SECRET_MEASUREMENT.try_init_once(|| context).is_ok()
    }

    pub fn measurement_collection(
        spdm_version: SpdmVersion,
        measurement_specification: SpdmMeasurementSpecification,
        measurement_hash_algo: SpdmMeasurementHashAlgo,
        measurement_index: usize,
    ) -> Option<SpdmMeasurementRecordStructure> {
        let context = SECRET_MEASUREMENT.try_get().ok()?;
        (context.measurement_collection_cb)(
            spdm_version,
            measurement_specification,
            measurement_hash_algo,
            measurement_index,
        )
    }

    pub fn generate_measurement_summary_hash(
        spdm_version: SpdmVersion,
        base_hash_algo: SpdmBaseHashAlgo,
        measurement_specification: SpdmMeasurementSpecification,
        measurement_hash_algo: SpdmMeasurementHashAlgo,
        measurement_summary_hash_type: u8,
    ) -> Option<SpdmDigestStruct> {
        let context = SECRET_MEASUREMENT.try_get().ok()?;
        (context.generate_measurement_summary_hash_cb)(
            spdm_version,
            base_hash_algo,
            measurement_specification,
            measurement_hash_algo,
            measurement_summary_hash_type,
        )
    }
}
