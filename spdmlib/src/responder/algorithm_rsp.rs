// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

/// Keep the strongest member of the intersection, or zero when disjoint.
fn select_highest(local: u32, offered: u32) -> u32 {
    let both = local & offered;
    if both == 0 {
        0
    } else {
        1u32 << (31 - both.leading_zeros())
    }
}

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_algorithm(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm negotiate_algorithms\n");
        if self.common.runtime_info.get_connection_state()
            != SpdmConnectionState::SpdmConnectionAfterCapabilities
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnexpectedRequest, 0);
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let negotiate_algorithms = match SpdmNegotiateAlgorithmsRequestPayload::spdm_read(
            &mut self.common,
            &mut reader,
        ) {
            Some(negotiate_algorithms) => negotiate_algorithms,
            None => {
                return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0)
            }
        };
        debug!("!!! negotiate_algorithms : {:02x?}\n", negotiate_algorithms);

        let config = &self.common.config_info;
        let mut measurement_specification_sel = negotiate_algorithms.measurement_specification;
        measurement_specification_sel.prioritize(config.measurement_specification);
        let base_hash_sel = SpdmBaseHashAlgo::from_bits_truncate(select_highest(
            config.base_hash_algo.bits(),
            negotiate_algorithms.base_hash_algo.bits(),
        ));
        let base_asym_sel = SpdmBaseAsymAlgo::from_bits_truncate(select_highest(
            config.base_asym_algo.bits(),
            negotiate_algorithms.base_asym_algo.bits(),
        ));
        let measurement_hash_sel = SpdmMeasurementHashAlgo::from_bits_truncate(select_highest(
            config.measurement_hash_algo.bits(),
            config.measurement_hash_algo.bits(),
        ));

        if base_hash_sel.bits() == 0 || base_asym_sel.bits() == 0 {
            error!("no common base algorithms\n");
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }

        let mut dhe_sel = SpdmDheAlgo::default();
        let mut aead_sel = SpdmAeadAlgo::default();
        let mut req_asym_sel = SpdmReqAsymAlgo::default();
        let mut key_schedule_sel = SpdmKeyScheduleAlgo::default();
        for alg in negotiate_algorithms
            .alg_struct
            .iter()
            .take(negotiate_algorithms.alg_struct_count as usize)
        {
            match alg.alg_supported {
                SpdmAlg::SpdmAlgoDhe(offered) => {
                    dhe_sel = SpdmDheAlgo::from_bits_truncate(
                        select_highest(config.dhe_algo.bits() as u32, offered.bits() as u32)
                            as u16,
                    );
                }
                SpdmAlg::SpdmAlgoAead(offered) => {
                    aead_sel = SpdmAeadAlgo::from_bits_truncate(
                        select_highest(config.aead_algo.bits() as u32, offered.bits() as u32)
                            as u16,
                    );
                }
                SpdmAlg::SpdmAlgoReqAsym(offered) => {
                    req_asym_sel = SpdmReqAsymAlgo::from_bits_truncate(
                        select_highest(config.req_asym_algo.bits() as u32, offered.bits() as u32)
                            as u16,
                    );
                }
                SpdmAlg::SpdmAlgoKeySchedule(offered) => {
                    key_schedule_sel = SpdmKeyScheduleAlgo::from_bits_truncate(select_highest(
                        config.key_schedule_algo.bits() as u32,
                        offered.bits() as u32,
                    )
                        as u16);
                }
                SpdmAlg::SpdmAlgoUnknown(_) => {}
            }
        }

        self.common.negotiate_info.measurement_specification_sel = measurement_specification_sel;
        self.common.negotiate_info.measurement_hash_sel = measurement_hash_sel;
        self.common.negotiate_info.base_hash_sel = base_hash_sel;
        self.common.negotiate_info.base_asym_sel = base_asym_sel;
        self.common.negotiate_info.dhe_sel = dhe_sel;
        self.common.negotiate_info.aead_sel = aead_sel;
        self.common.negotiate_info.req_asym_sel = req_asym_sel;
        self.common.negotiate_info.key_schedule_sel = key_schedule_sel;

        let alg_struct = [
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeDHE,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoDhe(dhe_sel),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeAEAD,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoAead(aead_sel),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeReqAsym,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoReqAsym(req_asym_sel),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeKeySchedule,
                alg_fixed_count: 2,
                alg_ext_count: 0,
                alg_supported: SpdmAlg::SpdmAlgoKeySchedule(key_schedule_sel),
            },
        ];

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseAlgorithms,
            },
            payload: SpdmMessagePayload::SpdmAlgorithmsResponse(SpdmAlgorithmsResponsePayload {
                measurement_specification_sel,
                measurement_hash_algo: measurement_hash_sel,
                base_asym_sel,
                base_hash_sel,
                alg_struct_count: negotiate_algorithms.alg_struct_count,
                alg_struct,
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        self.common.append_message_a(bytes)?;
        self.common.append_message_a(&send_buffer[..used])?;
        self.common
            .runtime_info
            .set_connection_state(SpdmConnectionState::SpdmConnectionNegotiated);

        self.send_message(&send_buffer[..used])
    }
}
