// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::Error;

const ANCHOR_32: &[u8] = b"_SM_";
const ANCHOR_64: &[u8] = b"_SM3_";
const LEN_32: usize = 0x1f;
const LEN_64: usize = 0x18;

/// Location and version of the SMBIOS structure table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    pub major: u8,
    pub minor: u8,
    /// Physical address of the structure table.
    pub table_address: u64,
    /// Length of the structure table in bytes. For 64-bit entry points this is an upper bound.
    pub table_len: u32,
}

impl EntryPoint {
    /// Number of leading bytes holding the anchor and length of either entry point version.
    pub const HEADER_LEN: usize = 7;

    /// Returns the length the entry point starting with `header` declares for itself.
    ///
    /// Only the first [`Self::HEADER_LEN`] bytes are looked at, so this can be used to find out
    /// how much memory to hand to [`Self::parse`].
    ///
    /// # Errors
    ///
    /// Returns an error if the anchor is unknown or the length is too small for its version.
    pub fn declared_len(header: &[u8]) -> crate::Result<usize> {
        let (offset, min_len) = if header.starts_with(ANCHOR_64) {
            (6, LEN_64)
        } else if header.starts_with(ANCHOR_32) {
            (5, LEN_32)
        } else {
            return Err(Error::BadAnchor);
        };

        let len = *header.get(offset).ok_or(Error::BadAnchor)?;
        if usize::from(len) < min_len {
            return Err(Error::BadLength(len));
        }

        Ok(usize::from(len))
    }

    /// Parses a 32-bit (`_SM_`) or 64-bit (`_SM3_`) entry point.
    ///
    /// # Errors
    ///
    /// Returns an error if the anchor, length or checksum of the entry point is invalid.
    pub fn parse(bytes: &[u8]) -> crate::Result<Self> {
        let ep = checked(bytes, Self::declared_len(bytes)?)?;

        if ep.starts_with(ANCHOR_64) {
            Ok(Self {
                major: ep[7],
                minor: ep[8],
                table_len: read_u32(ep, 0x0c),
                table_address: read_u64(ep, 0x10),
            })
        } else {
            if &ep[0x10..0x15] != b"_DMI_" {
                return Err(Error::BadAnchor);
            }

            Ok(Self {
                major: ep[6],
                minor: ep[7],
                table_len: u32::from(read_u16(ep, 0x16)),
                table_address: u64::from(read_u32(ep, 0x18)),
            })
        }
    }
}

fn checked(bytes: &[u8], len: usize) -> crate::Result<&[u8]> {
    let Some(ep) = bytes.get(..len) else {
        return Err(Error::BadLength(u8::try_from(len).unwrap_or(u8::MAX)));
    };

    if ep.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)) != 0 {
        return Err(Error::BadChecksum);
    }

    Ok(ep)
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_checksum(ep: &mut [u8], checksum_offset: usize) {
        ep[checksum_offset] = 0;
        let sum = ep.iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
        ep[checksum_offset] = 0u8.wrapping_sub(sum);
    }

    fn ep64() -> [u8; LEN_64] {
        let mut ep = [0u8; LEN_64];
        ep[..5].copy_from_slice(ANCHOR_64);
        ep[6] = LEN_64 as u8;
        ep[7] = 3;
        ep[8] = 4;
        ep[0x0c..0x10].copy_from_slice(&0x1234u32.to_le_bytes());
        ep[0x10..0x18].copy_from_slice(&0x7f00_0000u64.to_le_bytes());
        fix_checksum(&mut ep, 5);
        ep
    }

    #[test]
    fn parse_64() {
        assert_eq!(
            EntryPoint::parse(&ep64()),
            Ok(EntryPoint {
                major: 3,
                minor: 4,
                table_address: 0x7f00_0000,
                table_len: 0x1234,
            })
        );
    }

    #[test]
    fn parse_32() {
        let mut ep = [0u8; LEN_32];
        ep[..4].copy_from_slice(ANCHOR_32);
        ep[5] = LEN_32 as u8;
        ep[6] = 2;
        ep[7] = 8;
        ep[0x10..0x15].copy_from_slice(b"_DMI_");
        ep[0x16..0x18].copy_from_slice(&0x0456u16.to_le_bytes());
        ep[0x18..0x1c].copy_from_slice(&0x000f_0000u32.to_le_bytes());
        // the intermediate checksum covers 0x10..0x1f, keep it consistent as well
        fix_checksum(&mut ep[0x10..], 5);
        fix_checksum(&mut ep, 4);

        assert_eq!(
            EntryPoint::parse(&ep),
            Ok(EntryPoint {
                major: 2,
                minor: 8,
                table_address: 0xf_0000,
                table_len: 0x456,
            })
        );
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut ep = ep64();
        ep[0x10] ^= 1;
        assert_eq!(EntryPoint::parse(&ep), Err(Error::BadChecksum));
    }

    #[test]
    fn rejects_bad_anchor_and_length() {
        assert_eq!(EntryPoint::parse(b"_XX_....."), Err(Error::BadAnchor));

        let mut ep = ep64();
        ep[6] = 0x10;
        assert_eq!(EntryPoint::parse(&ep), Err(Error::BadLength(0x10)));
        assert_eq!(EntryPoint::parse(&ep64()[..0x10]), Err(Error::BadLength(LEN_64 as u8)));
    }

    #[test]
    fn declared_len_from_header() {
        let ep = ep64();
        assert_eq!(EntryPoint::declared_len(&ep[..EntryPoint::HEADER_LEN]), Ok(LEN_64));

        // trailing bytes past the declared length are not part of the entry point
        let mut padded = [0xffu8; 0x20];
        padded[..LEN_64].copy_from_slice(&ep);
        let len = EntryPoint::declared_len(&padded).unwrap();
        assert_eq!(EntryPoint::parse(&padded[..len]), EntryPoint::parse(&ep));

        let mut header = [0u8; EntryPoint::HEADER_LEN];
        header[..4].copy_from_slice(ANCHOR_32);
        header[5] = 0x1f;
        assert_eq!(EntryPoint::declared_len(&header), Ok(LEN_32));
        header[5] = 0x0e;
        assert_eq!(EntryPoint::declared_len(&header), Err(Error::BadLength(0x0e)));

        assert_eq!(EntryPoint::declared_len(b"_SM3_"), Err(Error::BadAnchor));
        assert_eq!(EntryPoint::declared_len(b"_DMI_\0\0"), Err(Error::BadAnchor));
    }
}
