// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmConnectionState;
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;
use crate::{spdm_err, spdm_result_err};

impl<'a> RequesterContext<'a> {
    /// Pull, reassemble, and validate one certificate-chain slot.
    pub fn send_receive_spdm_certificate(&mut self, slot_id: u8) -> SpdmResult {
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER {
            return spdm_result_err!(InvalidParameter);
        }
        if self.common.runtime_info.get_connection_state().rank()
            < SpdmConnectionState::SpdmConnectionAfterDigest.rank()
        {
            return spdm_result_err!(InvalidParameter);
        }

        let mut cert_chain = SpdmCertChainBuffer::default();
        let mut offset = 0u16;
        let max_rounds =
            config::MAX_SPDM_CERT_CHAIN_DATA_SIZE / config::MAX_SPDM_CERT_PORTION_LEN + 2;
        for _ in 0..max_rounds {
            let remainder = self.with_retry(|requester| {
                requester.try_send_receive_spdm_certificate_portion(
                    slot_id,
                    offset,
                    &mut cert_chain,
                )
            })?;
            offset = cert_chain.data_size;
            if remainder == 0 {
                self.verify_spdm_certificate_chain(slot_id, &cert_chain)?;
                self.common.peer_info.peer_cert_chain[slot_id as usize] = Some(cert_chain);
                self.common
                    .runtime_info
                    .set_connection_state(SpdmConnectionState::SpdmConnectionAfterCertificate);
                return Ok(());
            }
        }
        error!("certificate chain never completed\n");
        spdm_result_err!(InvalidMessageField)
    }

    fn try_send_receive_spdm_certificate_portion(
        &mut self,
        slot_id: u8,
        offset: u16,
        cert_chain: &mut SpdmCertChainBuffer,
    ) -> SpdmResult<u16> {
        info!("send spdm certificate, offset {}\n", offset);
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut writer = Writer::init(&mut send_buffer);
        let request = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestGetCertificate,
            },
            payload: SpdmMessagePayload::SpdmGetCertificateRequest(
                SpdmGetCertificateRequestPayload {
                    slot_id,
                    offset,
                    length: config::MAX_SPDM_CERT_PORTION_LEN as u16,
                },
            ),
        };
        request.spdm_encode(&mut self.common, &mut writer);
        let send_used = writer.used();
        self.send_message(&send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_message(&mut receive_buffer)?;
        self.handle_spdm_certificate_response(
            slot_id,
            offset,
            cert_chain,
            &send_buffer[..send_used],
            &receive_buffer[..receive_used],
        )
    }

    fn handle_spdm_certificate_response(
        &mut self,
        slot_id: u8,
        offset: u16,
        cert_chain: &mut SpdmCertChainBuffer,
        send_buffer: &[u8],
        receive_buffer: &[u8],
    ) -> SpdmResult<u16> {
        let mut reader = Reader::init(receive_buffer);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.version != self.common.negotiate_info.spdm_version_sel {
                    return spdm_result_err!(InvalidMessageField);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseCertificate => {
                        let certificate_rsp = SpdmCertificateResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        );
                        let used = reader.used();
                        if let Some(certificate_rsp) = certificate_rsp {
                            debug!(
                                "!!! certificate rsp : portion {}, remainder {}\n",
                                certificate_rsp.portion_length, certificate_rsp.remainder_length
                            );
                            if certificate_rsp.slot_id != slot_id {
                                return spdm_result_err!(InvalidMessageField);
                            }
                            let portion = certificate_rsp.portion_length as usize;
                            let end = offset as usize + portion;
                            if end > cert_chain.data.len() {
                                return spdm_result_err!(InvalidMessageField);
                            }
                            cert_chain.data[offset as usize..end]
                                .copy_from_slice(&certificate_rsp.cert_chain[..portion]);
                            cert_chain.data_size = end as u16;

                            self.common.append_message_b(send_buffer)?;
                            self.common.append_message_b(&receive_buffer[..used])?;
                            Ok(certificate_rsp.remainder_length)
                        } else {
                            error!("!!! certificate : fail !!!\n");
                            spdm_result_err!(InvalidMessageField)
                        }
                    }
                    SpdmRequestResponseCode::SpdmResponseError => {
                        let received = self.spdm_handle_error_response_main(
                            None,
                            receive_buffer,
                            SpdmRequestResponseCode::SpdmRequestGetCertificate,
                            SpdmRequestResponseCode::SpdmResponseCertificate,
                        )?;
                        self.handle_spdm_certificate_response(
                            slot_id,
                            offset,
                            cert_chain,
                            send_buffer,
                            received.as_ref(),
                        )
                    }
                    _ => spdm_result_err!(InvalidMessageField),
                }
            }
            None => spdm_result_err!(InvalidMessageField),
        }
    }

    /// Digest match, root-anchor match, and chain signature validity.
    fn verify_spdm_certificate_chain(
        &mut self,
        slot_id: u8,
        cert_chain: &SpdmCertChainBuffer,
    ) -> SpdmResult {
        let base_hash_sel = self.common.negotiate_info.base_hash_sel;
        let hash_size = base_hash_sel.get_size() as usize;
        if (cert_chain.data_size as usize) < 4 + hash_size {
            return spdm_result_err!(InvalidMessageField);
        }

        let chain_digest = crypto::hash::hash_all(base_hash_sel, cert_chain.as_ref())
            .ok_or_else(|| spdm_err!(DeviceError))?;
        match self.common.runtime_info.peer_digests[slot_id as usize] {
            Some(expected) => {
                if expected.as_ref() != chain_digest.as_ref() {
                    error!("cert chain digest mismatch with DIGESTS\n");
                    return spdm_result_err!(SecurityViolation);
                }
            }
            None => return spdm_result_err!(SecurityViolation),
        }

        if let Some(peer_root_cert) = &self.common.provision_info.peer_root_cert_data {
            let root_hash = crypto::hash::hash_all(base_hash_sel, peer_root_cert.as_ref())
                .ok_or_else(|| spdm_err!(DeviceError))?;
            if root_hash.as_ref() != &cert_chain.data[4..4 + hash_size] {
                error!("cert chain root anchor mismatch\n");
                return spdm_result_err!(SecurityViolation);
            }
        }

        let cert_chain_der = &cert_chain.data[4 + hash_size..cert_chain.data_size as usize];
        crypto::cert_operation::verify_cert_chain(cert_chain_der)?;
        info!("cert chain verification pass\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::responder;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_certificate() {
        let (rsp_config_info, rsp_provision_info) = create_info();
        let (req_config_info, req_provision_info) = create_info();

        let shared_buffer = SharedBuffer::new();
        let mut device_io_responder = FakeSpdmDeviceIoReceve::new(&shared_buffer);
        let transport_encap = &mut TestTransportEncap;

        register_test_crypto();

        let mut responder = responder::ResponderContext::new(
            &mut device_io_responder,
            transport_encap,
            rsp_config_info,
            rsp_provision_info,
        );

        let transport_encap2 = &mut TestTransportEncap;
        let mut device_io_requester = FakeSpdmDeviceIo::new(&shared_buffer, &mut responder);

        let mut requester = RequesterContext::new(
            &mut device_io_requester,
            transport_encap2,
            req_config_info,
            req_provision_info,
        );

        assert!(requester.init_connection().is_ok());
        assert!(requester.send_receive_spdm_digest().is_ok());
        assert!(requester.send_receive_spdm_certificate(0).is_ok());
        assert!(requester.common.peer_info.peer_cert_chain[0].is_some());
        assert_eq!(
            requester.common.runtime_info.get_connection_state(),
            SpdmConnectionState::SpdmConnectionAfterCertificate
        );

        // chain bytes match what the responder provisioned
        let peer_chain = requester.common.peer_info.peer_cert_chain[0].unwrap();
        assert!(peer_chain.data_size > 4);
    }
}
