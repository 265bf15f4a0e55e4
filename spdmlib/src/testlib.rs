// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Test scaffolding: an in-memory device pairing a live responder with a
//! requester, a one-byte loopback transport, canned configuration, a
//! synthetic certificate chain, and deterministic signing doubles wired
//! into the crypto registries.

use crate::common::{
    SpdmConfigInfo, SpdmDeviceIo, SpdmProvisionInfo, SpdmPskHintStruct, SpdmTransportEncap,
};
use crate::crypto::{SpdmAsymSign, SpdmAsymVerify, SpdmCertOperation};
use crate::error::SpdmResult;
use crate::protocol::*;
use crate::responder;
use crate::secret::SpdmSecretMeasurement;
use crate::{config, crypto, secret, spdm_err, spdm_result_err};
use core::cell::RefCell;

pub const TEST_PSK: &[u8] = b"TestPskData-TestPskData-32bytes!";
pub const TEST_PSK_HINT: &[u8] = b"TestPskHint";

/// One-slot message mailbox shared between the two fake devices.
pub struct SharedBuffer {
    queue: RefCell<Vec<u8>>,
}

impl SharedBuffer {
    #[allow(clippy::new_without_default)]
    pub fn new() -> SharedBuffer {
        SharedBuffer {
            queue: RefCell::new(Vec::new()),
        }
    }

    pub fn set_buffer(&self, bytes: &[u8]) {
        let mut queue = self.queue.borrow_mut();
        queue.clear();
        queue.extend_from_slice(bytes);
    }

    pub fn drain(&self, buffer: &mut [u8]) -> usize {
        let mut queue = self.queue.borrow_mut();
        let used = queue.len().min(buffer.len());
        buffer[..used].copy_from_slice(&queue[..used]);
        queue.clear();
        used
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Device for a responder driven directly by tests: `receive` pops
/// whatever the test (or the paired requester) left in the mailbox.
pub struct FakeSpdmDeviceIoReceve<'a> {
    data: &'a SharedBuffer,
}

impl<'a> FakeSpdmDeviceIoReceve<'a> {
    pub fn new(data: &'a SharedBuffer) -> Self {
        FakeSpdmDeviceIoReceve { data }
    }
}

impl SpdmDeviceIo for FakeSpdmDeviceIoReceve<'_> {
    fn send(&mut self, buffer: &[u8]) -> SpdmResult {
        self.data.set_buffer(buffer);
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8], _timeout: usize) -> Result<usize, usize> {
        let used = self.data.drain(buffer);
        if used == 0 {
            Err(0)
        } else {
            Ok(used)
        }
    }
}

/// Requester-side device that feeds a live responder inline: every send
/// lands in the mailbox and immediately runs one responder dispatch
/// round, so the reply is waiting when the requester receives.
pub struct FakeSpdmDeviceIo<'a, 'b, 'c> {
    pub data: &'a SharedBuffer,
    pub responder: &'b mut responder::ResponderContext<'c>,
}

impl<'a, 'b, 'c> FakeSpdmDeviceIo<'a, 'b, 'c> {
    pub fn new(
        data: &'a SharedBuffer,
        responder: &'b mut responder::ResponderContext<'c>,
    ) -> Self {
        FakeSpdmDeviceIo { data, responder }
    }
}

impl SpdmDeviceIo for FakeSpdmDeviceIo<'_, '_, '_> {
    fn send(&mut self, buffer: &[u8]) -> SpdmResult {
        self.data.set_buffer(buffer);
        self.responder.process_message(config::ST1)
    }

    fn receive(&mut self, buffer: &mut [u8], _timeout: usize) -> Result<usize, usize> {
        let used = self.data.drain(buffer);
        if used == 0 {
            Err(0)
        } else {
            Ok(used)
        }
    }
}

/// Device for codec-only tests; nothing may touch the wire.
pub struct MySpdmDeviceIo;

impl SpdmDeviceIo for MySpdmDeviceIo {
    fn send(&mut self, _buffer: &[u8]) -> SpdmResult {
        unimplemented!()
    }

    fn receive(&mut self, _buffer: &mut [u8], _timeout: usize) -> Result<usize, usize> {
        unimplemented!()
    }
}

const TEST_TRANSPORT_TYPE_SPDM: u8 = 0x05;
const TEST_TRANSPORT_TYPE_SECURED: u8 = 0x06;
const TEST_TRANSPORT_TYPE_APP: u8 = 0x01;

/// A one-byte-header loopback transport, enough to route plain, secured,
/// and application messages.
pub struct TestTransportEncap;

impl SpdmTransportEncap for TestTransportEncap {
    fn encap(
        &mut self,
        spdm_buffer: &[u8],
        transport_buffer: &mut [u8],
        secured_message: bool,
    ) -> SpdmResult<usize> {
        if transport_buffer.len() < spdm_buffer.len() + 1 {
            return spdm_result_err!(BufferTooSmall);
        }
        transport_buffer[0] = if secured_message {
            TEST_TRANSPORT_TYPE_SECURED
        } else {
            TEST_TRANSPORT_TYPE_SPDM
        };
        transport_buffer[1..1 + spdm_buffer.len()].copy_from_slice(spdm_buffer);
        Ok(1 + spdm_buffer.len())
    }

    fn decap(
        &mut self,
        transport_buffer: &[u8],
        spdm_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)> {
        if transport_buffer.is_empty() {
            return spdm_result_err!(InvalidMessageField);
        }
        let secured_message = match transport_buffer[0] {
            TEST_TRANSPORT_TYPE_SPDM => false,
            TEST_TRANSPORT_TYPE_SECURED => true,
            _ => return spdm_result_err!(InvalidMessageField),
        };
        let payload = &transport_buffer[1..];
        if spdm_buffer.len() < payload.len() {
            return spdm_result_err!(BufferTooSmall);
        }
        spdm_buffer[..payload.len()].copy_from_slice(payload);
        Ok((payload.len(), secured_message))
    }

    fn encap_app(
        &mut self,
        spdm_buffer: &[u8],
        app_buffer: &mut [u8],
        is_app_message: bool,
    ) -> SpdmResult<usize> {
        if app_buffer.len() < spdm_buffer.len() + 1 {
            return spdm_result_err!(BufferTooSmall);
        }
        app_buffer[0] = if is_app_message {
            TEST_TRANSPORT_TYPE_APP
        } else {
            TEST_TRANSPORT_TYPE_SPDM
        };
        app_buffer[1..1 + spdm_buffer.len()].copy_from_slice(spdm_buffer);
        Ok(1 + spdm_buffer.len())
    }

    fn decap_app(
        &mut self,
        app_buffer: &[u8],
        spdm_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)> {
        if app_buffer.is_empty() {
            return spdm_result_err!(InvalidMessageField);
        }
        let is_app_message = match app_buffer[0] {
            TEST_TRANSPORT_TYPE_SPDM => false,
            TEST_TRANSPORT_TYPE_APP => true,
            _ => return spdm_result_err!(InvalidMessageField),
        };
        let payload = &app_buffer[1..];
        if spdm_buffer.len() < payload.len() {
            return spdm_result_err!(BufferTooSmall);
        }
        spdm_buffer[..payload.len()].copy_from_slice(payload);
        Ok((payload.len(), is_app_message))
    }
}

pub fn new_context<'a>(
    my_spdm_device_io: &'a mut MySpdmDeviceIo,
    transport_encap: &'a mut TestTransportEncap,
) -> crate::common::SpdmContext<'a> {
    crate::common::SpdmContext::new(
        my_spdm_device_io,
        transport_encap,
        SpdmConfigInfo::default(),
        SpdmProvisionInfo::default(),
    )
}

/// A structurally valid two-certificate DER chain; the test doubles
/// accept it without parsing X.509 internals.
pub fn create_dummy_cert_chain_data() -> SpdmCertChainData {
    let mut data = SpdmCertChainData::default();
    let mut offset = 0usize;
    for seed in [0x11u8, 0x22u8].iter() {
        let body_len = 252usize;
        data.data[offset] = 0x30;
        data.data[offset + 1] = 0x82;
        data.data[offset + 2] = (body_len >> 8) as u8;
        data.data[offset + 3] = (body_len & 0xff) as u8;
        for i in 0..body_len {
            data.data[offset + 4 + i] = seed.wrapping_add(i as u8);
        }
        offset += 4 + body_len;
    }
    data.data_size = offset as u16;
    data
}

pub fn create_info() -> (SpdmConfigInfo, SpdmProvisionInfo) {
    let config_info = SpdmConfigInfo {
        spdm_version: [
            SpdmVersion::SpdmVersion10,
            SpdmVersion::SpdmVersion11,
            SpdmVersion::Unknown(0),
            SpdmVersion::Unknown(0),
            SpdmVersion::Unknown(0),
        ],
        req_capabilities: SpdmRequestCapabilityFlags::CERT_CAP
            | SpdmRequestCapabilityFlags::CHAL_CAP
            | SpdmRequestCapabilityFlags::ENCRYPT_CAP
            | SpdmRequestCapabilityFlags::MAC_CAP
            | SpdmRequestCapabilityFlags::KEY_EX_CAP
            | SpdmRequestCapabilityFlags::PSK_CAP
            | SpdmRequestCapabilityFlags::ENCAP_CAP
            | SpdmRequestCapabilityFlags::HBEAT_CAP
            | SpdmRequestCapabilityFlags::KEY_UPD_CAP,
        rsp_capabilities: SpdmResponseCapabilityFlags::CERT_CAP
            | SpdmResponseCapabilityFlags::CHAL_CAP
            | SpdmResponseCapabilityFlags::MEAS_CAP_SIG
            | SpdmResponseCapabilityFlags::ENCRYPT_CAP
            | SpdmResponseCapabilityFlags::MAC_CAP
            | SpdmResponseCapabilityFlags::KEY_EX_CAP
            | SpdmResponseCapabilityFlags::PSK_CAP_WITHOUT_CONTEXT
            | SpdmResponseCapabilityFlags::ENCAP_CAP
            | SpdmResponseCapabilityFlags::HBEAT_CAP
            | SpdmResponseCapabilityFlags::KEY_UPD_CAP,
        req_ct_exponent: 0,
        rsp_ct_exponent: 0,
        measurement_specification: SpdmMeasurementSpecification::DMTF,
        measurement_hash_algo: SpdmMeasurementHashAlgo::TPM_ALG_SHA_384,
        base_hash_algo: SpdmBaseHashAlgo::TPM_ALG_SHA_384,
        base_asym_algo: SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384,
        req_asym_algo: SpdmReqAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384,
        dhe_algo: SpdmDheAlgo::SECP_384_R1,
        aead_algo: SpdmAeadAlgo::AES_256_GCM,
        key_schedule_algo: SpdmKeyScheduleAlgo::SPDM_KEY_SCHEDULE,
        heartbeat_period: 1,
        psk: {
            let mut psk = SpdmPskStruct::default();
            psk.data_size = TEST_PSK.len() as u16;
            psk.data[..TEST_PSK.len()].copy_from_slice(TEST_PSK);
            psk
        },
        psk_hint: {
            let mut psk_hint = SpdmPskHintStruct::default();
            psk_hint.data_size = TEST_PSK_HINT.len() as u16;
            psk_hint.data[..TEST_PSK_HINT.len()].copy_from_slice(TEST_PSK_HINT);
            psk_hint
        },
        max_retry_times: 3,
        mut_auth_requested: false,
    };

    let mut provision_info = SpdmProvisionInfo::default();
    let cert_chain_data = create_dummy_cert_chain_data();
    let root_hash = crypto::hash::hash_all(
        config_info.base_hash_algo,
        &cert_chain_data.data[..256], // the root certificate
    )
    .unwrap();
    let cert_chain_buffer =
        SpdmCertChainBuffer::new(cert_chain_data.as_ref(), root_hash.as_ref()).unwrap();
    provision_info.my_cert_chain_data[0] = Some(cert_chain_data);
    provision_info.my_cert_chain[0] = Some(cert_chain_buffer);

    (config_info, provision_info)
}

// Deterministic signature double: the "signature" is the message digest
// cycled out to the algorithm's signature size, so a verifier with the
// same transcript accepts and any divergence rejects.
fn fake_signature(
    base_hash_algo: SpdmBaseHashAlgo,
    base_asym_algo: SpdmBaseAsymAlgo,
    data: &[u8],
) -> Option<SpdmSignatureStruct> {
    let digest = crypto::hash::hash_all(base_hash_algo, data)?;
    let size = base_asym_algo.get_size() as usize;
    if size == 0 {
        return None;
    }
    let mut signature = SpdmSignatureStruct {
        data_size: size as u16,
        ..Default::default()
    };
    for i in 0..size {
        signature.data[i] = digest.as_ref()[i % digest.data_size as usize];
    }
    Some(signature)
}

fn fake_asym_sign(
    base_hash_algo: SpdmBaseHashAlgo,
    base_asym_algo: SpdmBaseAsymAlgo,
    data: &[u8],
) -> Option<SpdmSignatureStruct> {
    fake_signature(base_hash_algo, base_asym_algo, data)
}

fn fake_asym_verify(
    base_hash_algo: SpdmBaseHashAlgo,
    base_asym_algo: SpdmBaseAsymAlgo,
    _public_cert_der: &[u8],
    data: &[u8],
    signature: &SpdmSignatureStruct,
) -> SpdmResult {
    let expected = fake_signature(base_hash_algo, base_asym_algo, data)
        .ok_or_else(|| spdm_err!(Unsupported))?;
    if expected.as_ref() == signature.as_ref() {
        Ok(())
    } else {
        spdm_result_err!(SecurityViolation)
    }
}

pub static ASYM_SIGN_IMPL: SpdmAsymSign = SpdmAsymSign {
    sign_cb: fake_asym_sign,
};

static ASYM_VERIFY_IMPL: SpdmAsymVerify = SpdmAsymVerify {
    verify_cb: fake_asym_verify,
};

fn fake_get_cert_from_cert_chain(cert_chain: &[u8], index: isize) -> SpdmResult<(usize, usize)> {
    let mut offset = 0usize;
    let mut this_index = 0isize;
    loop {
        if cert_chain.len() < offset + 4 || cert_chain[offset] != 0x30 {
            return spdm_result_err!(InvalidMessageField);
        }
        let this_cert_len =
            ((cert_chain[offset + 2] as usize) << 8) + (cert_chain[offset + 3] as usize) + 4;
        if cert_chain.len() < offset + this_cert_len {
            return spdm_result_err!(InvalidMessageField);
        }
        if this_index == index {
            return Ok((offset, offset + this_cert_len));
        }
        this_index += 1;
        if (offset + this_cert_len == cert_chain.len()) && (index == -1) {
            return Ok((offset, offset + this_cert_len));
        }
        offset += this_cert_len;
    }
}

fn fake_verify_cert_chain(_cert_chain: &[u8]) -> SpdmResult {
    Ok(())
}

static CERT_OPERATION_IMPL: SpdmCertOperation = SpdmCertOperation {
    get_cert_from_cert_chain_cb: fake_get_cert_from_cert_chain,
    verify_cert_chain_cb: fake_verify_cert_chain,
};

pub const TEST_MEASUREMENT_BLOCK_COUNT: u8 = 2;

fn fake_measurement_block(index: u8) -> SpdmMeasurementBlockStructure {
    let mut value = [0u8; config::MAX_SPDM_MEASUREMENT_VALUE_LEN];
    for (i, byte) in value.iter_mut().enumerate().take(48) {
        *byte = index.wrapping_add(i as u8);
    }
    SpdmMeasurementBlockStructure {
        index,
        measurement_specification: SpdmMeasurementSpecification::DMTF,
        measurement_size: 3 + 48,
        measurement: SpdmDmtfMeasurementStructure {
            r#type: SpdmDmtfMeasurementType::SpdmDmtfMeasurementFirmware,
            representation: SpdmDmtfMeasurementRepresentation::SpdmDmtfMeasurementDigest,
            value_size: 48,
            value,
        },
    }
}

fn fake_measurement_collection(
    _spdm_version: SpdmVersion,
    measurement_specification: SpdmMeasurementSpecification,
    _measurement_hash_algo: SpdmMeasurementHashAlgo,
    measurement_index: usize,
) -> Option<SpdmMeasurementRecordStructure> {
    if measurement_specification != SpdmMeasurementSpecification::DMTF {
        return None;
    }
    let mut record = SpdmMeasurementRecordStructure::default();
    match measurement_index {
        0 => {
            record.number_of_blocks = TEST_MEASUREMENT_BLOCK_COUNT;
        }
        0xFF => {
            record.number_of_blocks = TEST_MEASUREMENT_BLOCK_COUNT;
            for i in 0..TEST_MEASUREMENT_BLOCK_COUNT {
                record.record[i as usize] = fake_measurement_block(i + 1);
            }
        }
        index if (1..=TEST_MEASUREMENT_BLOCK_COUNT as usize).contains(&index) => {
            record.number_of_blocks = 1;
            record.record[0] = fake_measurement_block(index as u8);
        }
        _ => return None,
    }
    Some(record)
}

fn fake_measurement_summary_hash(
    _spdm_version: SpdmVersion,
    base_hash_algo: SpdmBaseHashAlgo,
    _measurement_specification: SpdmMeasurementSpecification,
    _measurement_hash_algo: SpdmMeasurementHashAlgo,
    measurement_summary_hash_type: u8,
) -> Option<SpdmDigestStruct> {
    let mut seed = [0u8; 8];
    seed[0] = measurement_summary_hash_type;
    crypto::hash::hash_all(base_hash_algo, &seed)
}

static SECRET_MEASUREMENT_IMPL: SpdmSecretMeasurement = SpdmSecretMeasurement {
    measurement_collection_cb: fake_measurement_collection,
    generate_measurement_summary_hash_cb: fake_measurement_summary_hash,
};

fn echo_app_message(_session_id: u32, app_message: &[u8], response: &mut [u8]) -> Option<usize> {
    if response.len() < app_message.len() {
        return None;
    }
    response[..app_message.len()].copy_from_slice(app_message);
    Some(app_message.len())
}

/// Install every test double. Registration is once-per-process; repeat
/// calls are no-ops, so each test starts with this.
pub fn register_test_crypto() {
    crypto::asym_sign::register(ASYM_SIGN_IMPL.clone());
    crypto::asym_verify::register(ASYM_VERIFY_IMPL.clone());
    crypto::cert_operation::register(CERT_OPERATION_IMPL.clone());
    secret::measurement::register(SECRET_MEASUREMENT_IMPL.clone());
    responder::register_app_message_handler(responder::SpdmAppMessageHandler {
        dispatch_app_message_cb: echo_app_message,
    });
}
