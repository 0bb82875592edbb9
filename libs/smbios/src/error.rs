// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The entry point does not start with `_SM_` or `_SM3_`.
    BadAnchor,
    /// The entry point length field is inconsistent with its version.
    BadLength(u8),
    /// The bytes of the entry point do not sum up to zero.
    BadChecksum,
    /// A structure extends past the end of the table.
    Truncated { offset: usize },
    /// A structure declares a formatted area shorter than its own header.
    BadStructureLength { offset: usize, length: u8 },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::BadAnchor => write!(f, "no SMBIOS entry point anchor found"),
            Error::BadLength(len) => write!(f, "invalid SMBIOS entry point length {len}"),
            Error::BadChecksum => write!(f, "SMBIOS entry point checksum mismatch"),
            Error::Truncated { offset } => {
                write!(f, "SMBIOS structure at offset {offset:#x} is truncated")
            }
            Error::BadStructureLength { offset, length } => write!(
                f,
                "SMBIOS structure at offset {offset:#x} has invalid length {length}"
            ),
        }
    }
}

impl core::error::Error for Error {}
