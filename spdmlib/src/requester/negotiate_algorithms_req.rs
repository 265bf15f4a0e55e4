// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::spdm_result_err;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_algorithm(&mut self) -> SpdmResult {
        self.with_retry(|requester| requester.try_send_receive_spdm_algorithm())
    }

    fn try_send_receive_spdm_algorithm(&mut self) -> SpdmResult {
        info!("send spdm algorithm\n");
        if self.common.runtime_info.get_connection_state()
            != SpdmConnectionState::SpdmConnectionAfterCapabilities
        {
            return spdm_result_err!(InvalidParameter);
        }

        let alg_struct_count = if self.common.negotiate_info.spdm_version_sel.get_u8()
            >= SpdmVersion::SpdmVersion11.get_u8()
        {
            4u8
        } else {
            0u8
        };
        let alg_struct = [
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeDHE,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoDhe(self.common.config_info.dhe_algo),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeAEAD,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoAead(self.common.config_info.aead_algo),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeReqAsym,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoReqAsym(self.common.config_info.req_asym_algo),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeKeySchedule,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoKeySchedule(
                    self.common.config_info.key_schedule_algo,
                ),
            },
        ];

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestNegotiateAlgorithms,
            },
            payload: SpdmMessagePayload::SpdmNegotiateAlgorithmsRequest(
                SpdmNegotiateAlgorithmsRequestPayload {
                    measurement_specification: self
                        .common
                        .config_info
                        .measurement_specification,
                    base_asym_algo: self.common.config_info.base_asym_algo,
                    base_hash_algo: self.common.config_info.base_hash_algo,
                    alg_struct_count,
                    alg_struct,
                },
            ),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_message(&send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_message(&mut receive_buffer)?;
        self.handle_spdm_algorithm_response(
            &send_buffer[..send_used],
            &receive_buffer[..receive_used],
        )
    }

    fn handle_spdm_algorithm_response(
        &mut self,
        send_buffer: &[u8],
        receive_buffer: &[u8],
    ) -> SpdmResult {
        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.version != self.common.negotiate_info.spdm_version_sel {
                    return spdm_result_err!(InvalidMessageField);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseAlgorithms => {
                        let algorithms_rsp =
                            SpdmAlgorithmsResponsePayload::spdm_read(&mut self.common, &mut reader);
                        let used = reader.used();
                        if let Some(algorithms_rsp) = algorithms_rsp {
                            debug!("!!! algorithms rsp : {:02x?}\n", algorithms_rsp);
                            self.apply_selected_algorithms(&algorithms_rsp)?;
                            self.common.append_message_a(send_buffer)?;
                            self.common.append_message_a(&receive_buffer[..used])?;
                            self.common.runtime_info.set_connection_state(
                                SpdmConnectionState::SpdmConnectionNegotiated,
                            );
                            Ok(())
                        } else {
                            error!("!!! algorithms : fail !!!\n");
                            spdm_result_err!(InvalidMessageField)
                        }
                    }
                    SpdmRequestResponseCode::SpdmResponseError => {
                        let received = self.spdm_handle_error_response_main(
                            None,
                            receive_buffer,
                            SpdmRequestResponseCode::SpdmRequestNegotiateAlgorithms,
                            SpdmRequestResponseCode::SpdmResponseAlgorithms,
                        )?;
                        self.handle_spdm_algorithm_response(send_buffer, received.as_ref())
                    }
                    _ => spdm_result_err!(InvalidMessageField),
                }
            }
            None => spdm_result_err!(InvalidMessageField),
        }
    }

    /// Each selection must be a single member of what this side offered.
    fn apply_selected_algorithms(
        &mut self,
        algorithms_rsp: &SpdmAlgorithmsResponsePayload,
    ) -> SpdmResult {
        let config = &self.common.config_info;

        let measurement_specification_sel = algorithms_rsp.measurement_specification_sel;
        if measurement_specification_sel.bits().count_ones() > 1
            || !config
                .measurement_specification
                .contains(measurement_specification_sel)
        {
            return spdm_result_err!(Unsupported);
        }
        let base_hash_sel = algorithms_rsp.base_hash_sel;
        if base_hash_sel.bits().count_ones() != 1
            || !config.base_hash_algo.contains(base_hash_sel)
        {
            return spdm_result_err!(Unsupported);
        }
        let base_asym_sel = algorithms_rsp.base_asym_sel;
        if base_asym_sel.bits().count_ones() != 1
            || !config.base_asym_algo.contains(base_asym_sel)
        {
            return spdm_result_err!(Unsupported);
        }
        let measurement_hash_sel = algorithms_rsp.measurement_hash_algo;
        if measurement_hash_sel.bits().count_ones() > 1
            || (measurement_hash_sel.bits() != 0
                && !config.measurement_hash_algo.contains(measurement_hash_sel))
        {
            return spdm_result_err!(Unsupported);
        }

        self.common.negotiate_info.measurement_specification_sel =
            measurement_specification_sel;
        self.common.negotiate_info.measurement_hash_sel = measurement_hash_sel;
        self.common.negotiate_info.base_hash_sel = base_hash_sel;
        self.common.negotiate_info.base_asym_sel = base_asym_sel;

        for alg in algorithms_rsp
            .alg_struct
            .iter()
            .take(algorithms_rsp.alg_struct_count as usize)
        {
            match alg.alg_supported {
                SpdmAlg::SpdmAlgoDhe(dhe_sel) => {
                    if dhe_sel.bits().count_ones() > 1
                        || !self.common.config_info.dhe_algo.contains(dhe_sel)
                    {
                        return spdm_result_err!(Unsupported);
                    }
                    self.common.negotiate_info.dhe_sel = dhe_sel;
                }
                SpdmAlg::SpdmAlgoAead(aead_sel) => {
                    if aead_sel.bits().count_ones() > 1
                        || !self.common.config_info.aead_algo.contains(aead_sel)
                    {
                        return spdm_result_err!(Unsupported);
                    }
                    self.common.negotiate_info.aead_sel = aead_sel;
                }
                SpdmAlg::SpdmAlgoReqAsym(req_asym_sel) => {
                    if req_asym_sel.bits().count_ones() > 1
                        || !self.common.config_info.req_asym_algo.contains(req_asym_sel)
                    {
                        return spdm_result_err!(Unsupported);
                    }
                    self.common.negotiate_info.req_asym_sel = req_asym_sel;
                }
                SpdmAlg::SpdmAlgoKeySchedule(key_schedule_sel) => {
                    if key_schedule_sel.bits().count_ones() > 1
                        || !self
                            .common
                            .config_info
                            .key_schedule_algo
                            .contains(key_schedule_sel)
                    {
                        return spdm_result_err!(Unsupported);
                    }
                    self.common.negotiate_info.key_schedule_sel = key_schedule_sel;
                }
                SpdmAlg::SpdmAlgoUnknown(_) => return spdm_result_err!(InvalidMessageField),
            }
        }
        Ok(())
    }
}
