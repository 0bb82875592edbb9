// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Minimal, zero-copy SMBIOS reader.
//!
//! Only what is needed to label a measurement is supported: the system manufacturer and product
//! name (type 1) and the installed memory devices (type 17). Both the 32-bit (`_SM_`) and the
//! 64-bit (`_SM3_`) entry points are understood.

#![cfg_attr(not(test), no_std)]

mod entry_point;
mod error;
mod structure;

pub use entry_point::EntryPoint;
pub use error::Error;
pub use structure::{MemoryDevice, Structure, Structures, SystemInfo};

pub type Result<T> = core::result::Result<T, Error>;

/// Structure type of the System Information structure.
pub const TYPE_SYSTEM_INFORMATION: u8 = 1;
/// Structure type of the Memory Device structure.
pub const TYPE_MEMORY_DEVICE: u8 = 17;
/// Structure type marking the end of the structure table.
pub const TYPE_END_OF_TABLE: u8 = 127;

/// Returns the System Information structure of the table, if present.
#[must_use]
pub fn system_info(table: &[u8]) -> Option<SystemInfo<'_>> {
    Structures::new(table)
        .filter_map(core::result::Result::ok)
        .find(|s| s.kind() == TYPE_SYSTEM_INFORMATION)
        .map(SystemInfo::from_structure)
}

/// Iterates over all *populated* memory devices of the table.
pub fn memory_devices(table: &[u8]) -> impl Iterator<Item = MemoryDevice<'_>> {
    Structures::new(table)
        .filter_map(core::result::Result::ok)
        .filter(|s| s.kind() == TYPE_MEMORY_DEVICE)
        .map(MemoryDevice::from_structure)
        .filter(|device| device.size_mib != Some(0))
}
