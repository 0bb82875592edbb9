// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Bookkeeping of the physical memory regions under test.
//!
//! A [`RegionMap`] is built once per run from the firmware memory inventory by [`normalize()`]
//! and afterward only ever shrinks, through [`RegionMap::exclude`], as ranges that the firmware
//! overwrote are discovered.

#![cfg_attr(not(test), no_std)]

mod address;
mod error;
mod exclude;
pub mod normalize;
mod region;
#[cfg(feature = "test_utils")]
pub mod test_utils;

pub use address::PhysicalAddress;
pub use error::Error;
pub use exclude::Exclusion;
pub use normalize::{Policy, RawRegion, RegionKind, normalize};
pub use region::{MapDiff, MemoryRegion, RegionMap};
use static_assertions::{const_assert, const_assert_eq};

pub type Result<T> = core::result::Result<T, Error>;

/// Size of a page, the unit in which memory is tracked.
pub const PAGE_SIZE: u64 = 0x1000;
/// Maximum number of entries in a [`RegionMap`].
pub const MAX_REGIONS: usize = 200;
/// Maximum number of descriptors accepted from the memory inventory.
pub const MAX_INVENTORY_ENTRIES: usize = 512;
/// Normalized regions start and end on a multiple of this.
pub const REGION_ALIGNMENT: u64 = 16 * 1024 * 1024;
/// Smallest region worth testing, 16 MiB.
pub const MIN_REGION_PAGES: u64 = REGION_ALIGNMENT / PAGE_SIZE;
/// Firmware scratch memory is expected below this address.
pub const FIRMWARE_CEILING: PhysicalAddress = PhysicalAddress::new(0x1_0000_0000);

const_assert!(PAGE_SIZE.is_power_of_two());
const_assert!(REGION_ALIGNMENT.is_power_of_two());
const_assert_eq!(REGION_ALIGNMENT % PAGE_SIZE, 0);
const_assert!(MAX_REGIONS <= MAX_INVENTORY_ENTRIES);
