// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::error::SpdmResult;
use crate::message::vendor;
use crate::responder::*;
use crate::spdm_err;

impl<'a> ResponderContext<'a> {
    pub fn handle_spdm_vendor_defined_request(
        &mut self,
        session_id: Option<u32>,
        bytes: &[u8],
    ) -> SpdmResult {
        info!("got spdm vendor_defined_request\n");
        let mut reader = Reader::init(bytes);
        SpdmMessageHeader::read(&mut reader).ok_or_else(|| spdm_err!(InvalidMessageField))?;
        let request = match SpdmVendorDefinedRequestPayload::spdm_read(
            &mut self.common,
            &mut reader,
        ) {
            Some(request) => request,
            None => {
                return self.send_spdm_error(
                    session_id,
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                )
            }
        };

        let rsp_payload = match vendor::vendor_defined_request_handler(&request.req_payload) {
            Ok(rsp_payload) => rsp_payload,
            Err(_) => {
                return self.send_spdm_error(
                    session_id,
                    SpdmErrorCode::SpdmErrorUnsupportedRequest,
                    0,
                )
            }
        };

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code:
                    SpdmRequestResponseCode::SpdmResponseVendorDefinedResponse,
            },
            payload: SpdmMessagePayload::SpdmVendorDefinedResponse(
                SpdmVendorDefinedResponsePayload {
                    standard_id: request.standard_id,
                    vendor_id: request.vendor_id,
                    rsp_payload,
                },
            ),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        let used = writer.used();
        self.send_response(session_id, &send_buffer[..used])
    }
}
