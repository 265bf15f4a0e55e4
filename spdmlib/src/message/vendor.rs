// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use crate::message::SpdmMessageGeneralPayload;
use crate::error::SpdmResult;
use crate::spdm_result_err;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};
use conquer_once::spin::OnceCell;

enum_builder! {
    @U16
    EnumName: RegistryOrStandardsBodyID;
    EnumVal{
        DMTF => 0x0,
        TCG => 0x1,
        USB => 0x2,
        PCISIG => 0x3,
        IANA => 0x4,
        HDBASET => 0x5,
        MIPI => 0x6,
        CXL => 0x7,
        JEDEC => 0x8
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VendorIDStruct {
    pub len: u8,
    pub vendor_id: [u8; config::MAX_SPDM_VENDOR_DEFINED_VENDOR_ID_LEN],
}

impl Default for VendorIDStruct {
    fn default() -> VendorIDStruct {
        VendorIDStruct {
            len: 0,
            vendor_id: [0u8; config::MAX_SPDM_VENDOR_DEFINED_VENDOR_ID_LEN],
        }
    }
}

impl Codec for VendorIDStruct {
    fn encode(&self, bytes: &mut Writer) {
        self.len.encode(bytes);
        assert!(bytes
            .extend_from_slice(&self.vendor_id[..self.len as usize])
            .is_some());
    }

    fn read(r: &mut Reader) -> Option<VendorIDStruct> {
        let len = u8::read(r)?;
        if len as usize > config::MAX_SPDM_VENDOR_DEFINED_VENDOR_ID_LEN {
            return None;
        }
        let raw = r.take(len as usize)?;
        let mut vendor_id = [0u8; config::MAX_SPDM_VENDOR_DEFINED_VENDOR_ID_LEN];
        vendor_id[..len as usize].copy_from_slice(raw);
        Some(VendorIDStruct { len, vendor_id })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VendorDefinedReqPayloadStruct {
    pub req_length: u16,
    pub vendor_defined_req_payload: [u8; config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE],
}

impl Default for VendorDefinedReqPayloadStruct {
    fn default() -> VendorDefinedReqPayloadStruct {
        VendorDefinedReqPayloadStruct {
            req_length: 0,
            vendor_defined_req_payload: [0u8; config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE],
        }
    }
}

impl Codec for VendorDefinedReqPayloadStruct {
    fn encode(&self, bytes: &mut Writer) {
        self.req_length.encode(bytes);
        assert!(bytes
            .extend_from_slice(&self.vendor_defined_req_payload[..self.req_length as usize])
            .is_some());
    }

    fn read(r: &mut Reader) -> Option<VendorDefinedReqPayloadStruct> {
        let req_length = u16::read(r)?;
        if req_length as usize > config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE {
            return None;
        }
        let raw = r.take(req_length as usize)?;
        let mut vendor_defined_req_payload =
            [0u8; config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE];
        vendor_defined_req_payload[..req_length as usize].copy_from_slice(raw);
        Some(VendorDefinedReqPayloadStruct {
            req_length,
            vendor_defined_req_payload,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VendorDefinedRspPayloadStruct {
    pub rsp_length: u16,
    pub vendor_defined_rsp_payload: [u8; config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE],
}

impl Default for VendorDefinedRspPayloadStruct {
    fn default() -> VendorDefinedRspPayloadStruct {
        VendorDefinedRspPayloadStruct {
            rsp_length: 0,
            vendor_defined_rsp_payload: [0u8; config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE],
        }
    }
}

impl Codec for VendorDefinedRspPayloadStruct {
    fn encode(&self, bytes: &mut Writer) {
        self.rsp_length.encode(bytes);
        assert!(bytes
            .extend_from_slice(&self.vendor_defined_rsp_payload[..self.rsp_length as usize])
            .is_some());
    }

    fn read(r: &mut Reader) -> Option<VendorDefinedRspPayloadStruct> {
        let rsp_length = u16::read(r)?;
        if rsp_length as usize > config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE {
            return None;
        }
        let raw = r.take(rsp_length as usize)?;
        let mut vendor_defined_rsp_payload =
            [0u8; config::MAX_SPDM_VENDOR_DEFINED_PAYLOAD_SIZE];
        vendor_defined_rsp_payload[..rsp_length as usize].copy_from_slice(raw);
        Some(VendorDefinedRspPayloadStruct {
            rsp_length,
            vendor_defined_rsp_payload,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmVendorDefinedRequestPayload {
    pub standard_id: RegistryOrStandardsBodyID,
    pub vendor_id: VendorIDStruct,
    pub req_payload: VendorDefinedReqPayloadStruct,
}

impl SpdmCodec for SpdmVendorDefinedRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
        self.standard_id.encode(bytes);
        self.vendor_id.encode(bytes);
        self.req_payload.encode(bytes);
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmVendorDefinedRequestPayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved
        let standard_id = RegistryOrStandardsBodyID::read(r)?;
        let vendor_id = VendorIDStruct::read(r)?;
        let req_payload = VendorDefinedReqPayloadStruct::read(r)?;

        Some(SpdmVendorDefinedRequestPayload {
            standard_id,
            vendor_id,
            req_payload,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmVendorDefinedResponsePayload {
    pub standard_id: RegistryOrStandardsBodyID,
    pub vendor_id: VendorIDStruct,
    pub rsp_payload: VendorDefinedRspPayloadStruct,
}

impl SpdmCodec for SpdmVendorDefinedResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        SpdmMessageGeneralPayload::default().encode(bytes); // param1/param2 reserved
        self.standard_id.encode(bytes);
        self.vendor_id.encode(bytes);
        self.rsp_payload.encode(bytes);
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmVendorDefinedResponsePayload> {
        SpdmMessageGeneralPayload::read(r)?; // param1/param2 reserved
        let standard_id = RegistryOrStandardsBodyID::read(r)?;
        let vendor_id = VendorIDStruct::read(r)?;
        let rsp_payload = VendorDefinedRspPayloadStruct::read(r)?;

        Some(SpdmVendorDefinedResponsePayload {
            standard_id,
            vendor_id,
            rsp_payload,
        })
    }
}

#[derive(Clone)]
pub struct VendorDefinedStruct {
    pub vendor_defined_request_handler:
        fn(vendor_defined_request_payload: &VendorDefinedReqPayloadStruct)
            -> SpdmResult<VendorDefinedRspPayloadStruct>,
}

static VENDOR_DEFINED: OnceCell<VendorDefinedStruct> = OnceCell::uninit();

pub fn register_vendor_defined_struct(context: VendorDefinedStruct) -> bool {
    VENDOR_DEFINED.try_init_once(|| context).is_ok()
}

pub fn vendor_defined_request_handler(
    vendor_defined_request_payload: &VendorDefinedReqPayloadStruct,
) -> SpdmResult<VendorDefinedRspPayloadStruct> {
    if let Ok(context) = VENDOR_DEFINED.try_get() {
        (context.vendor_defined_request_handler)(vendor_defined_request_payload)
    } else {
        spdm_result_err!(Unsupported)
    }
}
