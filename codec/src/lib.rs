// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Wire primitives shared by the SPDM crates: a `Codec` trait over
//! slice-backed readers and writers, little-endian integer impls, and the
//! `enum_builder!` macro for byte-tagged protocol enums.

#![no_std]
#![forbid(unsafe_code)]

/// Write cursor over a caller-provided byte slice.
///
/// Encoding never grows the underlying storage; callers size the buffer
/// from the `config` limits and a push past the end is a hard failure.
pub struct Writer<'a> {
    buffer: &'a mut [u8],
    used: usize,
}

impl<'a> Writer<'a> {
    pub fn init(buffer: &'a mut [u8]) -> Writer<'a> {
        Writer { buffer, used: 0 }
    }

    pub fn push(&mut self, byte: u8) -> Option<()> {
        if self.used < self.buffer.len() {
            self.buffer[self.used] = byte;
            self.used += 1;
            Some(())
        } else {
            None
        }
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Option<()> {
        if self.left() < bytes.len() {
            return None;
        }
        self.buffer[self.used..self.used + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();
        Some(())
    }

    /// Bytes written so far.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn left(&self) -> usize {
        self.buffer.len() - self.used
    }

    pub fn mut_used_slice(&mut self) -> &mut [u8] {
        &mut self.buffer[..self.used]
    }

    pub fn used_slice(&self) -> &[u8] {
        &self.buffer[..self.used]
    }

    /// Discard everything written after `mark` (a prior `used()` value).
    pub fn truncate(&mut self, mark: usize) {
        if mark <= self.used {
            self.used = mark;
        }
    }
}

/// Read cursor over a byte slice.
pub struct Reader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    pub fn init(buffer: &'a [u8]) -> Reader<'a> {
        Reader { buffer, cursor: 0 }
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buffer[self.cursor..];
        self.cursor = self.buffer.len();
        rest
    }

    pub fn take(&mut self, length: usize) -> Option<&'a [u8]> {
        if self.left() < length {
            return None;
        }
        let out = &self.buffer[self.cursor..self.cursor + length];
        self.cursor += length;
        Some(out)
    }

    pub fn any_left(&self) -> bool {
        self.cursor < self.buffer.len()
    }

    pub fn left(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn used(&self) -> usize {
        self.cursor
    }
}

/// Things that know how to encode and decode themselves.
pub trait Codec: Sized {
    fn encode(&self, bytes: &mut Writer);
    fn read(r: &mut Reader) -> Option<Self>;

    fn read_bytes(bytes: &[u8]) -> Option<Self> {
        let mut reader = Reader::init(bytes);
        Self::read(&mut reader)
    }
}

impl Codec for u8 {
    fn encode(&self, bytes: &mut Writer) {
        assert!(bytes.push(*self).is_some());
    }

    fn read(r: &mut Reader) -> Option<u8> {
        r.take(1).map(|b| b[0])
    }
}

impl Codec for u16 {
    fn encode(&self, bytes: &mut Writer) {
        assert!(bytes.extend_from_slice(&self.to_le_bytes()).is_some());
    }

    fn read(r: &mut Reader) -> Option<u16> {
        let b = r.take(2)?;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }
}

/// A three-byte little-endian integer, used for measurement record lengths.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct u24(pub u32);

impl u24 {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Codec for u24 {
    fn encode(&self, bytes: &mut Writer) {
        assert!(bytes
            .extend_from_slice(&self.0.to_le_bytes()[..3])
            .is_some());
    }

    fn read(r: &mut Reader) -> Option<u24> {
        let b = r.take(3)?;
        Some(u24(u32::from_le_bytes([b[0], b[1], b[2], 0])))
    }
}

impl Codec for u32 {
    fn encode(&self, bytes: &mut Writer) {
        assert!(bytes.extend_from_slice(&self.to_le_bytes()).is_some());
    }

    fn read(r: &mut Reader) -> Option<u32> {
        let b = r.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl Codec for u64 {
    fn encode(&self, bytes: &mut Writer) {
        assert!(bytes.extend_from_slice(&self.to_le_bytes()).is_some());
    }

    fn read(r: &mut Reader) -> Option<u64> {
        let b = r.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Some(u64::from_le_bytes(raw))
    }
}

/// Generate a byte-tagged protocol enum with an `Unknown` catch-all, a
/// `get_*` accessor for the raw value, and a `Codec` impl.
#[macro_export]
macro_rules! enum_builder {
    (@U8 EnumName: $enum_name:ident; EnumVal { $( $enum_var:ident => $enum_val:expr ),* }) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum $enum_name {
            $( $enum_var ),*
            ,Unknown(u8)
        }

        impl $enum_name {
            pub fn get_u8(&self) -> u8 {
                match *self {
                    $( $enum_name::$enum_var => $enum_val ),*
                    ,$enum_name::Unknown(x) => x
                }
            }
        }

        impl Codec for $enum_name {
            fn encode(&self, bytes: &mut $crate::Writer) {
                self.get_u8().encode(bytes);
            }

            fn read(r: &mut $crate::Reader) -> Option<Self> {
                Some(match u8::read(r)? {
                    $( $enum_val => $enum_name::$enum_var ),*
                    ,x => $enum_name::Unknown(x)
                })
            }
        }

        impl Default for $enum_name {
            fn default() -> $enum_name {
                $enum_name::Unknown(0)
            }
        }
    };
    (@U16 EnumName: $enum_name:ident; EnumVal { $( $enum_var:ident => $enum_val:expr ),* }) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum $enum_name {
            $( $enum_var ),*
            ,Unknown(u16)
        }

        impl $enum_name {
            pub fn get_u16(&self) -> u16 {
                match *self {
                    $( $enum_name::$enum_var => $enum_val ),*
                    ,$enum_name::Unknown(x) => x
                }
            }
        }

        impl Codec for $enum_name {
            fn encode(&self, bytes: &mut $crate::Writer) {
                self.get_u16().encode(bytes);
            }

            fn read(r: &mut $crate::Reader) -> Option<Self> {
                Some(match u16::read(r)? {
                    $( $enum_val => $enum_name::$enum_var ),*
                    ,x => $enum_name::Unknown(x)
                })
            }
        }

        impl Default for $enum_name {
            fn default() -> $enum_name {
                $enum_name::Unknown(0)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    enum_builder! {
        @U8
        EnumName: TestKind;
        EnumVal{
            Alpha => 0x1,
            Beta => 0x7f
        }
    }

    #[test]
    fn test_case0_integers_round_trip() {
        let buf = &mut [0u8; 32];
        let mut writer = Writer::init(buf);
        0xa5u8.encode(&mut writer);
        0x1234u16.encode(&mut writer);
        u24(0x00fe_dcba).encode(&mut writer);
        0xdead_beefu32.encode(&mut writer);
        0x0123_4567_89ab_cdefu64.encode(&mut writer);
        assert_eq!(writer.used(), 1 + 2 + 3 + 4 + 8);

        let mut reader = Reader::init(buf);
        assert_eq!(u8::read(&mut reader).unwrap(), 0xa5);
        assert_eq!(u16::read(&mut reader).unwrap(), 0x1234);
        assert_eq!(u24::read(&mut reader).unwrap().get(), 0x00fe_dcba);
        assert_eq!(u32::read(&mut reader).unwrap(), 0xdead_beef);
        assert_eq!(u64::read(&mut reader).unwrap(), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn test_case0_little_endian_layout() {
        let buf = &mut [0u8; 4];
        let mut writer = Writer::init(buf);
        0x0102_0304u32.encode(&mut writer);
        assert_eq!(buf, &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_case0_reader_take_and_left() {
        let buf = [1u8, 2, 3, 4, 5];
        let mut reader = Reader::init(&buf);
        assert_eq!(reader.take(2).unwrap(), &[1, 2]);
        assert_eq!(reader.left(), 3);
        assert_eq!(reader.used(), 2);
        assert!(reader.take(4).is_none());
        assert_eq!(reader.rest(), &[3, 4, 5]);
        assert!(!reader.any_left());
    }

    #[test]
    fn test_case0_writer_overflow() {
        let buf = &mut [0u8; 2];
        let mut writer = Writer::init(buf);
        assert!(writer.extend_from_slice(&[1, 2, 3]).is_none());
        assert_eq!(writer.used(), 0);
        assert!(writer.extend_from_slice(&[1, 2]).is_some());
        assert!(writer.push(3).is_none());
    }

    #[test]
    fn test_case0_enum_builder() {
        let buf = &mut [0u8; 2];
        let mut writer = Writer::init(buf);
        TestKind::Beta.encode(&mut writer);
        TestKind::Unknown(0x33).encode(&mut writer);

        let mut reader = Reader::init(buf);
        assert_eq!(TestKind::read(&mut reader).unwrap(), TestKind::Beta);
        assert_eq!(
            TestKind::read(&mut reader).unwrap(),
            TestKind::Unknown(0x33)
        );
        assert_eq!(TestKind::Alpha.get_u8(), 0x1);
        assert_eq!(TestKind::default(), TestKind::Unknown(0));
    }
}
