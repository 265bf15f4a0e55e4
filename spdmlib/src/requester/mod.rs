// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

mod context;

mod challenge_req;
mod encap_req;
mod end_session_req;
mod finish_req;
mod get_capabilities_req;
mod get_certificate_req;
mod get_digests_req;
mod get_measurements_req;
mod get_version_req;
mod handle_error_response_req;
mod heartbeat_req;
mod key_exchange_req;
mod key_update_req;
mod negotiate_algorithms_req;
mod psk_exchange_req;
mod psk_finish_req;

pub use context::RequesterContext;

pub use crate::config;
pub use crate::error::{SpdmErrorKind, SpdmResult};
pub use crate::message::*;
pub use crate::protocol::*;
pub use codec::{Codec, Reader, Writer};

/// A response captured off the wire, handed between the receive path and
/// the per-exchange parsers (including RESPOND_IF_READY replays).
pub struct ReceivedMessage {
    pub receive_buffer: [u8; crate::config::MAX_SPDM_MESSAGE_BUFFER_SIZE],
    pub used: usize,
}

impl Default for ReceivedMessage {
    fn default() -> ReceivedMessage {
        ReceivedMessage {
            receive_buffer: [0u8; crate::config::MAX_SPDM_MESSAGE_BUFFER_SIZE],
            used: 0,
        }
    }
}

impl AsRef<[u8]> for ReceivedMessage {
    fn as_ref(&self) -> &[u8] {
        &self.receive_buffer[..self.used]
    }
}
