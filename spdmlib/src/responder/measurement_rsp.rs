// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::{SpdmConnectionState, SpdmOpaqueStruct};
use crate::crypto;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::secret;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_measurement(
        &mut self,
        session_id: Option<u32>,
        bytes: &[u8],
    ) -> SpdmResult {
        info!("got spdm get_measurements\n");
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return self.send_spdm_error(
                session_id,
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            );
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let get_measurements =
            match SpdmGetMeasurementsRequestPayload::spdm_read(&mut self.common, &mut reader) {
                Some(get_measurements) => get_measurements,
                None => {
                    return self.send_spdm_error(
                        session_id,
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
        debug!("!!! get_measurements : {:02x?}\n", get_measurements);

        let signature_requested = get_measurements
            .measurement_attributes
            .contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED);
        let rsp_capabilities = self.common.negotiate_info.rsp_capabilities_sel;
        if signature_requested {
            if !rsp_capabilities.contains(SpdmResponseCapabilityFlags::MEAS_CAP_SIG) {
                return self.send_spdm_error(
                    session_id,
                    SpdmErrorCode::SpdmErrorUnsupportedRequest,
                    0,
                );
            }
        } else if !rsp_capabilities.contains(SpdmResponseCapabilityFlags::MEAS_CAP_SIG)
            && !rsp_capabilities.contains(SpdmResponseCapabilityFlags::MEAS_CAP_NO_SIG)
        {
            return self.send_spdm_error(
                session_id,
                SpdmErrorCode::SpdmErrorUnsupportedRequest,
                0,
            );
        }
        self.common.runtime_info.need_measurement_signature = signature_requested;

        let measurement_index = match get_measurements.measurement_operation {
            SpdmMeasurementOperation::SpdmMeasurementQueryTotalNumber => 0usize,
            SpdmMeasurementOperation::SpdmMeasurementRequestAll => 0xFFusize,
            SpdmMeasurementOperation::Unknown(index) => {
                if (0xF0..=0xFC).contains(&index) {
                    return self.send_spdm_error(
                        session_id,
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    );
                }
                index as usize
            }
        };

        let measurement_record = match secret::measurement::measurement_collection(
            self.common.negotiate_info.spdm_version_sel,
            self.common.negotiate_info.measurement_specification_sel,
            self.common.negotiate_info.measurement_hash_sel,
            measurement_index,
        ) {
            Some(measurement_record) => measurement_record,
            None => {
                return self.send_spdm_error(
                    session_id,
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                )
            }
        };

        let (number_of_measurement, record) = match get_measurements.measurement_operation {
            SpdmMeasurementOperation::SpdmMeasurementQueryTotalNumber => (
                measurement_record.number_of_blocks,
                SpdmMeasurementRecordStructure::default(),
            ),
            _ => (0, measurement_record),
        };

        let mut nonce = [0u8; SPDM_NONCE_SIZE];
        crypto::rand::get_random(&mut nonce)?;

        let base_asym_size = if signature_requested {
            self.common.negotiate_info.base_asym_sel.get_size() as usize
        } else {
            0
        };

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseMeasurements,
            },
            payload: SpdmMessagePayload::SpdmMeasurementsResponse(
                SpdmMeasurementsResponsePayload {
                    number_of_measurement,
                    slot_id: get_measurements.slot_id,
                    content_changed: 0,
                    measurement_record: record,
                    nonce: SpdmNonceStruct { data: nonce },
                    opaque: SpdmOpaqueStruct::default(),
                    signature: SpdmSignatureStruct {
                        data_size: base_asym_size as u16,
                        ..Default::default()
                    },
                },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        self.common.append_message_m(session_id, bytes)?;
        self.common
            .append_message_m(session_id, &send_buffer[..used - base_asym_size])?;

        if signature_requested {
            let message_l1l2 = self.common.calc_l1l2(session_id)?;
            let signature = match crypto::asym_sign::sign(
                self.common.negotiate_info.base_hash_sel,
                self.common.negotiate_info.base_asym_sel,
                message_l1l2.as_ref(),
            ) {
                Some(signature) => signature,
                None => {
                    error!("measurements signing fail\n");
                    self.common.reset_message_m(session_id);
                    return self.send_spdm_error(
                        session_id,
                        SpdmErrorCode::SpdmErrorUnspecified,
                        0,
                    );
                }
            };
            send_buffer[used - base_asym_size..used].copy_from_slice(signature.as_ref());
            // the signed batch closes this measurement transcript
            self.common.reset_message_m(session_id);
        }

        self.send_response(session_id, &send_buffer[..used])
    }
}
