// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::SpdmContext;
use crate::protocol::{SpdmDheExchangeStruct, SpdmDigestStruct, SpdmSignatureStruct};
use codec::{Reader, Writer};

/// Encode/decode for payloads whose field sizes or presence depend on the
/// negotiated connection state.
pub trait SpdmCodec: Sized {
    fn spdm_encode(&self, context: &mut SpdmContext, bytes: &mut Writer);
    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<Self>;
}

impl SpdmCodec for SpdmDigestStruct {
    fn spdm_encode(&self, context: &mut SpdmContext, bytes: &mut Writer) {
        let size = context.negotiate_info.base_hash_sel.get_size() as usize;
        assert!(bytes.extend_from_slice(&self.data[..size]).is_some());
    }

    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmDigestStruct> {
        let size = context.negotiate_info.base_hash_sel.get_size() as usize;
        let raw = r.take(size)?;
        let mut digest = SpdmDigestStruct {
            data_size: size as u16,
            ..Default::default()
        };
        digest.data[..size].copy_from_slice(raw);
        Some(digest)
    }
}

impl SpdmCodec for SpdmSignatureStruct {
    fn spdm_encode(&self, context: &mut SpdmContext, bytes: &mut Writer) {
        let size = context.negotiate_info.base_asym_sel.get_size() as usize;
        assert!(bytes.extend_from_slice(&self.data[..size]).is_some());
    }

    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmSignatureStruct> {
        let size = context.negotiate_info.base_asym_sel.get_size() as usize;
        let raw = r.take(size)?;
        let mut signature = SpdmSignatureStruct {
            data_size: size as u16,
            ..Default::default()
        };
        signature.data[..size].copy_from_slice(raw);
        Some(signature)
    }
}

impl SpdmCodec for SpdmDheExchangeStruct {
    fn spdm_encode(&self, context: &mut SpdmContext, bytes: &mut Writer) {
        let size = context.negotiate_info.dhe_sel.get_size() as usize;
        assert!(bytes.extend_from_slice(&self.data[..size]).is_some());
    }

    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmDheExchangeStruct> {
        let size = context.negotiate_info.dhe_sel.get_size() as usize;
        let raw = r.take(size)?;
        let mut exchange = SpdmDheExchangeStruct {
            data_size: size as u16,
            ..Default::default()
        };
        exchange.data[..size].copy_from_slice(raw);
        Some(exchange)
    }
}
