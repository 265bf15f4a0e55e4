// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use core::fmt;

/// Caller-visible failure classes. Retry policy: `Busy` and `NotReady` are
/// retryable by the engine itself; everything else surfaces immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmErrorKind {
    /// Transport failed or the peer demanded a resynchronization.
    DeviceError,
    /// Negotiation intersection is empty, or the peer lacks a capability.
    Unsupported,
    /// Malformed argument from the caller.
    InvalidParameter,
    /// A wire message failed codec validation.
    InvalidMessageField,
    /// Signature/MAC/AEAD verification failed, unexpected ERROR code, or
    /// replay detected.
    SecurityViolation,
    /// Output buffer insufficient for the produced data.
    BufferTooSmall,
    /// Peer answered ERROR(RESPONSE_NOT_READY) and the retry budget ran out.
    NotReady,
    /// Peer answered ERROR(BUSY) and the retry budget ran out.
    Busy,
    /// The operation needs an established session and none is active.
    SessionRequired,
}

impl SpdmErrorKind {
    fn describe(&self) -> &'static str {
        match self {
            SpdmErrorKind::DeviceError => "device or transport error",
            SpdmErrorKind::Unsupported => "unsupported by negotiation",
            SpdmErrorKind::InvalidParameter => "invalid caller parameter",
            SpdmErrorKind::InvalidMessageField => "invalid message field",
            SpdmErrorKind::SecurityViolation => "security violation",
            SpdmErrorKind::BufferTooSmall => "buffer too small",
            SpdmErrorKind::NotReady => "responder not ready",
            SpdmErrorKind::Busy => "responder busy",
            SpdmErrorKind::SessionRequired => "no session established",
        }
    }
}

/// An error annotated with the call site that raised it, via `spdm_err!`.
#[derive(Debug, Clone, Copy)]
pub struct SpdmError {
    pub kind: SpdmErrorKind,
    pub file: &'static str,
    pub line: u32,
}

impl SpdmError {
    pub fn new(kind: SpdmErrorKind, file: &'static str, line: u32) -> SpdmError {
        SpdmError { kind, file, line }
    }
}

impl PartialEq for SpdmError {
    fn eq(&self, other: &SpdmError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for SpdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.kind.describe(),
            self.file,
            self.line
        )
    }
}

pub type SpdmResult<T = ()> = core::result::Result<T, SpdmError>;

#[macro_export]
macro_rules! spdm_err {
    ($kind:ident) => {
        $crate::error::SpdmError::new($crate::error::SpdmErrorKind::$kind, file!(), line!())
    };
}

#[macro_export]
macro_rules! spdm_result_err {
    ($kind:ident) => {
        Err($crate::spdm_err!($kind))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_error_compares_on_kind() {
        let a = spdm_err!(SecurityViolation);
        let result: SpdmResult = spdm_result_err!(SecurityViolation);
        let b = result.unwrap_err();
        assert_eq!(a, b);
        assert_ne!(a, spdm_err!(DeviceError));
    }

    #[test]
    fn test_case0_error_display_names_call_site() {
        let err = spdm_err!(BufferTooSmall);
        let text = format!("{}", err);
        assert!(text.contains("buffer too small"));
        assert!(text.contains("error.rs"));
    }
}
