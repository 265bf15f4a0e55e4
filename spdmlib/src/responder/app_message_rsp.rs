// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::error::SpdmResult;
use crate::responder::*;
use conquer_once::spin::OnceCell;

/// Application traffic inside a session belongs to the embedder; the
/// engine only moves it through the record layer.
#[derive(Clone)]
pub struct SpdmAppMessageHandler {
    pub dispatch_app_message_cb:
        fn(session_id: u32, app_message: &[u8], response: &mut [u8]) -> Option<usize>,
}

static APP_MESSAGE_HANDLER: OnceCell<SpdmAppMessageHandler> = OnceCell::uninit();

pub fn register_app_message_handler(context: SpdmAppMessageHandler) -> bool {
    APP_MESSAGE_HANDLER.try_init_once(|| context).is_ok()
}

impl<'a> ResponderContext<'a> {
    pub fn dispatch_secured_app_message(
        &mut self,
        session_id: u32,
        app_message: &[u8],
    ) -> SpdmResult {
        info!("got app message in session {:08x}\n", session_id);
        let handler = match APP_MESSAGE_HANDLER.try_get() {
            Ok(handler) => handler,
            Err(_) => {
                return self.send_spdm_error(
                    Some(session_id),
                    SpdmErrorCode::SpdmErrorUnexpectedRequest,
                    0,
                )
            }
        };

        let mut response = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        match (handler.dispatch_app_message_cb)(session_id, app_message, &mut response) {
            Some(used) => self.send_secured_message(session_id, &response[..used], true),
            None => self.send_spdm_error(
                Some(session_id),
                SpdmErrorCode::SpdmErrorUnexpectedRequest,
                0,
            ),
        }
    }
}
