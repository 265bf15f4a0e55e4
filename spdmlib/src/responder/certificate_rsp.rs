// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::error::SpdmResult;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_certificate(&mut self, bytes: &[u8]) -> SpdmResult {
        info!("got spdm get_certificate\n");
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionNegotiated.rank()
        {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorUnexpectedRequest, 0);
        }

        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let get_certificate =
            match SpdmGetCertificateRequestPayload::spdm_read(&mut self.common, &mut reader) {
                Some(get_certificate) => get_certificate,
                None => {
                    return self.send_spdm_error(
                        None,
                        SpdmErrorCode::SpdmErrorInvalidRequest,
                        0,
                    )
                }
            };
        debug!("!!! get_certificate : {:02x?}\n", get_certificate);

        let slot_id = get_certificate.slot_id;
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }
        let cert_chain = match &self.common.provision_info.my_cert_chain[slot_id as usize] {
            Some(cert_chain) => *cert_chain,
            None => {
                return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0)
            }
        };

        let offset = get_certificate.offset as usize;
        if offset >= cert_chain.data_size as usize {
            return self.send_spdm_error(None, SpdmErrorCode::SpdmErrorInvalidRequest, 0);
        }
        let portion_length = (get_certificate.length as usize)
            .min(config::MAX_SPDM_CERT_PORTION_LEN)
            .min(cert_chain.data_size as usize - offset);
        let remainder_length = cert_chain.data_size as usize - offset - portion_length;

        let mut payload = SpdmCertificateResponsePayload {
            slot_id,
            portion_length: portion_length as u16,
            remainder_length: remainder_length as u16,
            ..Default::default()
        };
        payload.cert_chain[..portion_length]
            .copy_from_slice(&cert_chain.data[offset..offset + portion_length]);

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseCertificate,
            },
            payload: SpdmMessagePayload::SpdmCertificateResponse(payload),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();

        self.common.append_message_b(bytes)?;
        self.common.append_message_b(&send_buffer[..used])?;
        if remainder_length == 0
            && self.common.runtime_info.get_connection_state().rank()
                < SpdmConnectionState::SpdmConnectionAfterCertificate.rank()
        {
            self.common
                .runtime_info
                .set_connection_state(SpdmConnectionState::SpdmConnectionAfterCertificate);
        }

        self.send_message(&send_buffer[..used])
    }
}
