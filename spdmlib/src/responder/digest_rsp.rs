// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::crypto;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_digest(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm get_digests\n");
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnexpectedRequest, 0);
        }
        if !self
            .common
            .negotiate_info
            .rsp_capabilities_sel
            .contains(SpdmResponseCapabilityFlags::CERT_CAP)
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnsupportedRequest, 0);
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        if SpdmGetDigestsRequestPayload::spdm_read(&mut self.common, &mut reader).is_none() {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }

        let mut slot_mask = 0u8;
        let mut digests = [SpdmDigestStruct::default(); config::SPDM_MAX_SLOT_NUMBER];
        let mut digest_count = 0usize;
        for slot in 0..config::SPDM_MAX_SLOT_NUMBER {
            if let Some(cert_chain) = &self.common.provision_info.my_cert_chain[slot] {
                slot_mask |= 1 << slot;
                digests[digest_count] = crypto::hash::hash_all(
                    self.common.negotiate_info.base_hash_sel,
                    cert_chain.as_ref(),
                )
                .ok_or_else(|| spdm_err!(DeviceError))?;
                digest_count += 1;
            }
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseDigests,
            },
            payload: SpdmMessagePayload::SpdmDigestsResponse(SpdmDigestsResponsePayload {
                slot_mask,
                digests,
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        self.common.append_message_b(bytes)?;
        self.common.append_message_b(&send_buffer[..used])?;
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionAfterDigest.rank()
        {
            self.common
                .runtime_info
                .set_connection_state(SpdmConnectionState::SpdmConnectionAfterDigest);
        }

        self.send_message(&send_buffer[..used])
    }
}
