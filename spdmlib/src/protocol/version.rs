// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmVersion;
    EnumVal{
        SpdmVersion10 => 0x10,
        SpdmVersion11 => 0x11,
        SpdmVersion12 => 0x12
    }
}

impl SpdmVersion {
    pub fn from_u8(value: u8) -> SpdmVersion {
        match value {
            0x10 => SpdmVersion::SpdmVersion10,
            0x11 => SpdmVersion::SpdmVersion11,
            0x12 => SpdmVersion::SpdmVersion12,
            x => SpdmVersion::Unknown(x),
        }
    }
}

/// One VERSION table entry: `major.minor` plus update/alpha nibbles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpdmVersionStruct {
    pub update: u8,
    pub version: SpdmVersion,
}

impl Codec for SpdmVersionStruct {
    fn encode(&self, bytes: &mut Writer) {
        let raw = ((self.version.get_u8() as u16) << 8) | ((self.update as u16) << 4);
        raw.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmVersionStruct> {
        let raw = u16::read(r)?;
        Some(SpdmVersionStruct {
            update: ((raw >> 4) & 0xf) as u8,
            version: SpdmVersion::from_u8((raw >> 8) as u8),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_version_struct_round_trip() {
        let u8_slice = &mut [0u8; 2];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmVersionStruct {
            update: 3,
            version: SpdmVersion::SpdmVersion11,
        };
        value.encode(&mut writer);
        assert_eq!(u8_slice, &[0x30, 0x11]);

        let mut reader = Reader::init(u8_slice);
        let entry = SpdmVersionStruct::read(&mut reader).unwrap();
        assert_eq!(entry.update, 3);
        assert_eq!(entry.version, SpdmVersion::SpdmVersion11);
    }

    #[test]
    fn test_case0_version_ordering_by_value() {
        assert!(SpdmVersion::SpdmVersion12.get_u8() > SpdmVersion::SpdmVersion10.get_u8());
    }
}
