// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_measurement(
        &mut self,
        session_id: Option<u32>,
        slot_id: u8,
        measurement_attributes: SpdmMeasurementAttributes,
        measurement_operation: SpdmMeasurementOperation,
        out_total_number: &mut u8,
        spdm_measurement_record_structure: &mut SpdmMeasurementRecordStructure,
    ) -> SpdmResult {
        *out_total_number = self.with_retry(|requester| {
            requester.try_send_receive_spdm_measurement_record(
                session_id,
                slot_id,
                measurement_attributes,
                measurement_operation,
                spdm_measurement_record_structure,
            )
        })?;
        Ok(())
    }

    fn try_send_receive_spdm_measurement_record(
        &mut self,
        session_id: Option<u32>,
        slot_id: u8,
        measurement_attributes: SpdmMeasurementAttributes,
        measurement_operation: SpdmMeasurementOperation,
        spdm_measurement_record_structure: &mut SpdmMeasurementRecordStructure,
    ) -> SpdmResult<u8> {
        info!("send spdm measurement\n");
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER {
            return spdm_result_err!(InvalidParameter);
        }
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return spdm_result_err!(InvalidParameter);
        }
        if let SpdmMeasurementOperation::Unknown(index) = measurement_operation {
            // 0xF0-0xFC are reserved index values
            if (0xF0..=0xFC).contains(&index) {
                return spdm_result_err!(InvalidParameter);
            }
        }

        let mut nonce = [0u8; SPDM_NONCE_SIZE];
        crypto::rand::get_random(&mut nonce)?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestGetMeasurements,
            },
            payload: SpdmMessagePayload::SpdmGetMeasurementsRequest(
                SpdmGetMeasurementsRequestPayload {
                    measurement_attributes,
                    measurement_operation,
                    nonce: SpdmNonceStruct { data: nonce },
                    slot_id,
                },
            ),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();

        match session_id {
            Some(session_id) => {
                self.send_secured_message(session_id, &send_buffer[..send_used], false)?;
            }
            None => {
                self.send_message(&send_buffer[..send_used])?;
            }
        }

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let used = match session_id {
            Some(session_id) => {
                self.receive_secured_message(session_id, &mut receive_buffer)?
            }
            None => self.receive_message(&mut receive_buffer)?,
        };

        self.handle_spdm_measurement_record_response(
            session_id,
            slot_id,
            measurement_attributes,
            measurement_operation,
            spdm_measurement_record_structure,
            &send_buffer[..send_used],
            &receive_buffer[..used],
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_spdm_measurement_record_response(
        &mut self,
        session_id: Option<u32>,
        slot_id: u8,
        measurement_attributes: SpdmMeasurementAttributes,
        measurement_operation: SpdmMeasurementOperation,
        spdm_measurement_record_structure: &mut SpdmMeasurementRecordStructure,
        send_buffer: &[u8],
        receive_buffer: &[u8],
    ) -> SpdmResult<u8> {
        self.common.runtime_info.need_measurement_signature =
            measurement_attributes.contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED);

        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.version != self.common.negotiate_info.spdm_version_sel {
                    return spdm_result_err!(InvalidMessageField);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseMeasurements => {
                        let measurements = SpdmMeasurementsResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        );
                        let used = reader.used();
                        if let Some(measurements) = measurements {
                            debug!("!!! measurements : {:02x?}\n", measurements);

                            let base_asym_size =
                                self.common.negotiate_info.base_asym_sel.get_size() as usize;
                            let temp_used = used
                                - if self.common.runtime_info.need_measurement_signature {
                                    base_asym_size
                                } else {
                                    0
                                };

                            self.common.append_message_m(session_id, send_buffer)?;
                            self.common
                                .append_message_m(session_id, &receive_buffer[..temp_used])?;

                            if measurement_attributes
                                .contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED)
                            {
                                if self
                                    .verify_measurement_signature(
                                        slot_id,
                                        session_id,
                                        &measurements.signature,
                                    )
                                    .is_err()
                                {
                                    error!("verify_measurement_signature fail\n");
                                    self.common.reset_message_m(session_id);
                                    return spdm_result_err!(SecurityViolation);
                                }
                                info!("verify_measurement_signature pass\n");
                                // a signed batch closes the measurement
                                // transcript
                                self.common.reset_message_m(session_id);
                            }

                            *spdm_measurement_record_structure =
                                measurements.measurement_record;

                            match measurement_operation {
                                SpdmMeasurementOperation::SpdmMeasurementQueryTotalNumber => {
                                    Ok(measurements.number_of_measurement)
                                }
                                _ => Ok(measurements.measurement_record.number_of_blocks),
                            }
                        } else {
                            error!("!!! measurements : fail !!!\n");
                            spdm_result_err!(InvalidMessageField)
                        }
                    }
                    SpdmRequestResponseCode::SpdmResponseError => {
                        let received = self.spdm_handle_error_response_main(
                            session_id,
                            receive_buffer,
                            SpdmRequestResponseCode::SpdmRequestGetMeasurements,
                            SpdmRequestResponseCode::SpdmResponseMeasurements,
                        )?;
                        self.handle_spdm_measurement_record_response(
                            session_id,
                            slot_id,
                            measurement_attributes,
                            measurement_operation,
                            spdm_measurement_record_structure,
                            send_buffer,
                            received.as_ref(),
                        )
                    }
                    _ => spdm_result_err!(InvalidMessageField),
                }
            }
            None => spdm_result_err!(InvalidMessageField),
        }
    }

    fn verify_measurement_signature(
        &self,
        slot_id: u8,
        session_id: Option<u32>,
        signature: &SpdmSignatureStruct,
    ) -> SpdmResult {
        let message_l1l2 = self.common.calc_l1l2(session_id)?;
        debug!("message_l1l2 size - {:?}\n", message_l1l2.data_size());

        let peer_cert_chain = self.common.peer_info.peer_cert_chain[slot_id as usize]
            .as_ref()
            .ok_or_else(|| spdm_err!(InvalidParameter))?;
        let hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;
        let cert_chain_data =
            &peer_cert_chain.data[4 + hash_size..peer_cert_chain.data_size as usize];

        crypto::asym_verify::verify(
            self.common.negotiate_info.base_hash_sel,
            self.common.negotiate_info.base_asym_sel,
            cert_chain_data,
            message_l1l2.as_ref(),
            signature,
        )
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::responder;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_measurement() {
        let (rsp_config_info, rsp_provision_info) = create_info();
        let (req_config_info, req_provision_info) = create_info();

        let shared_buffer = SharedBuffer::new();
        let mut device_io_responder = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = responder::ResponderContext::new(
            &mut device_io_responder,
            transport_encap,
            rsp_config_info,
            rsp_provision_info,
        );

        let transport_encap2 = &mut TestTransportEncap;
        let mut device_io_requester = FakeSpdmDeviceIo::new(&shared_buffer, &mut responder);

        let mut requester = RequesterContext::new(
            &mut device_io_requester,
            transport_encap2,
            req_config_info,
            req_provision_info,
        );

        assert!(requester.init_connection().is_ok());
        assert!(requester.send_receive_spdm_digest().is_ok());
        assert!(requester.send_receive_spdm_certificate(0).is_ok());

        let mut total_number = 0u8;
        let mut record = SpdmMeasurementRecordStructure::default();
        assert!(requester
            .send_receive_spdm_measurement(
                None,
                0,
                SpdmMeasurementAttributes::empty(),
                SpdmMeasurementOperation::SpdmMeasurementQueryTotalNumber,
                &mut total_number,
                &mut record,
            )
            .is_ok());
        assert!(total_number > 0);

        let mut block_count = 0u8;
        assert!(requester
            .send_receive_spdm_measurement(
                None,
                0,
                SpdmMeasurementAttributes::SIGNATURE_REQUESTED,
                SpdmMeasurementOperation::SpdmMeasurementRequestAll,
                &mut block_count,
                &mut record,
            )
            .is_ok());
        assert_eq!(block_count, total_number);
        assert_eq!(record.number_of_blocks, total_number);
    }

    #[test]
    fn test_case1_reserved_index_rejected() {
        let (rsp_config_info, rsp_provision_info) = create_info();
        let (req_config_info, req_provision_info) = create_info();

        let shared_buffer = SharedBuffer::new();
        let mut device_io_responder = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = responder::ResponderContext::new(
            &mut device_io_responder,
            transport_encap,
            rsp_config_info,
            rsp_provision_info,
        );

        let transport_encap2 = &mut TestTransportEncap;
        let mut device_io_requester = FakeSpdmDeviceIo::new(&shared_buffer, &mut responder);

        let mut requester = RequesterContext::new(
            &mut device_io_requester,
            transport_encap2,
            req_config_info,
            req_provision_info,
        );

        assert!(requester.init_connection().is_ok());
        let mut total_number = 0u8;
        let mut record = SpdmMeasurementRecordStructure::default();
        let status = requester.send_receive_spdm_measurement(
            None,
            0,
            SpdmMeasurementAttributes::empty(),
            SpdmMeasurementOperation::Unknown(0xF5),
            &mut total_number,
            &mut record,
        );
        assert_eq!(status, spdm_result_err!(InvalidParameter));
    }
}
