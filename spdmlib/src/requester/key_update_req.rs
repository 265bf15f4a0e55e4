// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::session::SpdmSessionState;
use crate::common::spdm_codec::SpdmCodec;
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    /// Rotate the data traffic keys. `SpdmUpdateKey` rotates the
    /// request direction, `SpdmUpdateAllKeys` both; the new generation is
    /// committed once the ACK decrypts, and an UpdateAllKeys round is
    /// probed with VerifyNewKey.
    pub fn send_receive_spdm_key_update(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
    ) -> SpdmResult {
        info!("send spdm key update\n");
        if key_update_operation != SpdmKeyUpdateOperation::SpdmUpdateKey
            && key_update_operation != SpdmKeyUpdateOperation::SpdmUpdateAllKeys
        {
            return spdm_result_err!(InvalidParameter);
        }
        {
            let session = self
                .common
                .get_immutable_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            if session.get_session_state() != SpdmSessionState::SpdmSessionEstablished {
                return spdm_result_err!(SessionRequired);
            }
        }
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::KEY_UPD_CAP)
            || !self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::KEY_UPD_CAP)
        {
            return spdm_result_err!(Unsupported);
        }

        let update_requester = true;
        let update_responder =
            key_update_operation == SpdmKeyUpdateOperation::SpdmUpdateAllKeys;

        self.send_receive_spdm_key_update_op(
            session_id,
            key_update_operation,
            update_requester,
            update_responder,
        )?;

        if update_responder {
            self.send_receive_spdm_key_update_op(
                session_id,
                SpdmKeyUpdateOperation::SpdmVerifyNewKey,
                false,
                false,
            )?;
        }
        Ok(())
    }

    fn send_receive_spdm_key_update_op(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
        update_requester: bool,
        update_responder: bool,
    ) -> SpdmResult {
        let mut tag = [0u8; 1];
        crypto::rand::get_random(&mut tag)?;
        let tag = tag[0];

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestKeyUpdate,
            },
            payload: SpdmMessagePayload::SpdmKeyUpdateRequest(SpdmKeyUpdateRequestPayload {
                key_update_operation,
                tag,
            }),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_secured_message(session_id, &send_buffer[..send_used], false)?;

        // switch over right away, holding the old generation as backup
        // until the ACK proves the peer rotated too
        if update_requester || update_responder {
            let session = self
                .common
                .get_session_via_id(session_id)
                .ok_or_else(|| spdm_err!(SessionRequired))?;
            session.create_data_secret_update(update_requester, update_responder)?;
        }

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let result = self
            .receive_secured_message(session_id, &mut receive_buffer)
            .and_then(|receive_used| {
                self.handle_spdm_key_update_ack(
                    session_id,
                    key_update_operation,
                    tag,
                    &receive_buffer[..receive_used],
                )
            });

        if update_requester || update_responder {
            if let Some(session) = self.common.get_session_via_id(session_id) {
                session.activate_data_secret_update(
                    update_requester,
                    update_responder,
                    result.is_ok(),
                )?;
            }
        }
        result
    }

    fn handle_spdm_key_update_ack(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
        tag: u8,
        receive_buffer: &[u8],
    ) -> SpdmResult {
        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => match message_header.request_response_code {
                SpdmRequestResponseCode::SpdmResponseKeyUpdateAck => {
                    let key_update_rsp =
                        SpdmKeyUpdateResponsePayload::spdm_read(&mut self.common, &mut reader)
                            .ok_or_else(|| spdm_err!(InvalidMessageField))?;
                    debug!("!!! key_update rsp : {:02x?}\n", key_update_rsp);
                    if key_update_rsp.key_update_operation != key_update_operation
                        || key_update_rsp.tag != tag
                    {
                        return spdm_result_err!(InvalidMessageField);
                    }
                    Ok(())
                }
                SpdmRequestResponseCode::SpdmResponseError => {
                    let status = self.spdm_handle_error_response_main(
                        Some(session_id),
                        receive_buffer,
                        SpdmRequestResponseCode::SpdmRequestKeyUpdate,
                        SpdmRequestResponseCode::SpdmResponseKeyUpdateAck,
                    );
                    match status {
                        Err(err) => Err(err),
                        Ok(_) => spdm_result_err!(SecurityViolation),
                    }
                }
                _ => spdm_result_err!(InvalidMessageField),
            },
            None => spdm_result_err!(InvalidMessageField),
        }
    }
}
