// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use crate::entry_point::{read_u16, read_u32};
use crate::{Error, TYPE_END_OF_TABLE};

const HEADER_LEN: usize = 4;

/// A single SMBIOS structure: the formatted area followed by its string set.
#[derive(Clone, Copy)]
pub struct Structure<'a> {
    formatted: &'a [u8],
    strings: &'a [u8],
}

impl<'a> Structure<'a> {
    #[must_use]
    pub fn kind(&self) -> u8 {
        self.formatted[0]
    }

    #[must_use]
    pub fn handle(&self) -> u16 {
        read_u16(self.formatted, 2)
    }

    /// The formatted area of the structure, including the 4 byte header.
    #[must_use]
    pub fn formatted(&self) -> &'a [u8] {
        self.formatted
    }

    #[must_use]
    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.formatted.get(offset).copied()
    }

    #[must_use]
    pub fn word(&self, offset: usize) -> Option<u16> {
        (offset + 2 <= self.formatted.len()).then(|| read_u16(self.formatted, offset))
    }

    #[must_use]
    pub fn dword(&self, offset: usize) -> Option<u32> {
        (offset + 4 <= self.formatted.len()).then(|| read_u32(self.formatted, offset))
    }

    /// Returns the string referenced by the byte at `offset` of the formatted area.
    ///
    /// String references are 1-based, a reference of zero means "no string". Strings that are not
    /// valid UTF-8 or consist only of whitespace are treated as absent.
    #[must_use]
    pub fn string_at(&self, offset: usize) -> Option<&'a str> {
        let index = usize::from(self.byte(offset)?).checked_sub(1)?;

        let raw = self.strings.split(|b| *b == 0).nth(index)?;
        let s = core::str::from_utf8(raw).ok()?.trim();
        (!s.is_empty()).then_some(s)
    }
}

impl fmt::Debug for Structure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("kind", &self.kind())
            .field("handle", &self.handle())
            .field("len", &self.formatted.len())
            .finish_non_exhaustive()
    }
}

/// Iterator over the structures of an SMBIOS structure table.
///
/// Iteration stops after the end-of-table structure, at the end of the buffer, or after the first
/// malformed structure (which is yielded as an error).
pub struct Structures<'a> {
    table: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Structures<'a> {
    #[must_use]
    pub fn new(table: &'a [u8]) -> Self {
        Self {
            table,
            offset: 0,
            done: false,
        }
    }

    fn parse_next(&mut self) -> crate::Result<Option<Structure<'a>>> {
        let offset = self.offset;
        let rest = &self.table[offset..];

        if rest.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = rest[1];
        let len = usize::from(length);
        if len < HEADER_LEN {
            return Err(Error::BadStructureLength { offset, length });
        }
        if len > rest.len() {
            return Err(Error::Truncated { offset });
        }

        let (formatted, tail) = rest.split_at(len);

        // the string set is terminated by two consecutive NUL bytes
        let strings_len = tail
            .windows(2)
            .position(|w| w == [0, 0])
            .ok_or(Error::Truncated { offset })?;

        self.offset = offset + len + strings_len + 2;

        Ok(Some(Structure {
            formatted,
            strings: &tail[..strings_len],
        }))
    }
}

impl<'a> Iterator for Structures<'a> {
    type Item = crate::Result<Structure<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.parse_next() {
            Ok(Some(structure)) => {
                if structure.kind() == TYPE_END_OF_TABLE {
                    self.done = true;
                }
                Some(Ok(structure))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                log::warn!("{err}");
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// System Information (type 1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemInfo<'a> {
    pub manufacturer: Option<&'a str>,
    pub product_name: Option<&'a str>,
    pub version: Option<&'a str>,
    pub serial_number: Option<&'a str>,
}

impl<'a> SystemInfo<'a> {
    #[must_use]
    pub fn from_structure(s: Structure<'a>) -> Self {
        Self {
            manufacturer: s.string_at(0x04),
            product_name: s.string_at(0x05),
            version: s.string_at(0x06),
            serial_number: s.string_at(0x07),
        }
    }
}

/// Memory Device (type 17).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryDevice<'a> {
    pub locator: Option<&'a str>,
    pub bank_locator: Option<&'a str>,
    pub manufacturer: Option<&'a str>,
    pub serial_number: Option<&'a str>,
    pub part_number: Option<&'a str>,
    /// Installed size in MiB. `Some(0)` means the slot is empty, `None` that the size is unknown.
    pub size_mib: Option<u64>,
    /// Configured speed in MT/s, falling back to the maximum rated speed.
    pub speed_mts: Option<u32>,
}

impl<'a> MemoryDevice<'a> {
    #[must_use]
    pub fn from_structure(s: Structure<'a>) -> Self {
        Self {
            locator: s.string_at(0x10),
            bank_locator: s.string_at(0x11),
            manufacturer: s.string_at(0x17),
            serial_number: s.string_at(0x18),
            part_number: s.string_at(0x1a),
            size_mib: size_mib(&s),
            speed_mts: speed(&s, 0x20, 0x58).or_else(|| speed(&s, 0x15, 0x54)),
        }
    }
}

fn size_mib(s: &Structure<'_>) -> Option<u64> {
    match s.word(0x0c)? {
        0xffff => None,
        // the real size is in the extended size field, in MiB
        0x7fff => s.dword(0x1c).map(|ext| u64::from(ext & 0x7fff_ffff)),
        // granularity bit set means KiB
        size if size & 0x8000 != 0 => Some(u64::from(size & 0x7fff) / 1024),
        size => Some(u64::from(size)),
    }
}

fn speed(s: &Structure<'_>, offset: usize, extended_offset: usize) -> Option<u32> {
    match s.word(offset)? {
        0 => None,
        0xffff => s
            .dword(extended_offset)
            .map(|ext| ext & 0x7fff_ffff)
            .filter(|ext| *ext != 0),
        speed => Some(u32::from(speed)),
    }
}
