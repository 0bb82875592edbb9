// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt::{Display, Formatter};

use crate::{MAX_INVENTORY_ENTRIES, MAX_REGIONS, MemoryRegion, PhysicalAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The region map already holds the maximum number of entries.
    CapacityExceeded,
    /// The memory inventory reported more descriptors than we are able to process.
    TooManyDescriptors(usize),
    /// A descriptor describes a range that does not fit into the physical address space.
    InvalidDescriptor { start: PhysicalAddress, page_count: u64 },
    /// A region is empty or not page aligned.
    InvalidRegion(MemoryRegion),
    /// A region overlaps with a region already present in the map.
    Overlap {
        region: MemoryRegion,
        existing: MemoryRegion,
    },
    /// The map has no entry at the given index.
    NoSuchEntry(usize),
    /// The range to be excluded is empty, not page aligned or not fully contained in its entry.
    OutOfBounds {
        index: usize,
        base: PhysicalAddress,
        page_count: u64,
    },
    /// Excluding the range would leave the map without any entries.
    LastRegion,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::CapacityExceeded => {
                write!(f, "region map capacity of {MAX_REGIONS} entries exceeded")
            }
            Error::TooManyDescriptors(n) => write!(
                f,
                "memory inventory reported {n} descriptors, at most {MAX_INVENTORY_ENTRIES} are supported"
            ),
            Error::InvalidDescriptor { start, page_count } => write!(
                f,
                "descriptor at {start} with {page_count} pages exceeds the physical address space"
            ),
            Error::InvalidRegion(region) => {
                write!(f, "region {region} is empty or not page aligned")
            }
            Error::Overlap { region, existing } => {
                write!(f, "region {region} overlaps with {existing}")
            }
            Error::NoSuchEntry(index) => write!(f, "region map has no entry {index}"),
            Error::OutOfBounds {
                index,
                base,
                page_count,
            } => write!(
                f,
                "range at {base} with {page_count} pages is not contained in entry {index}"
            ),
            Error::LastRegion => write!(f, "refusing to exclude the last remaining region"),
        }
    }
}

impl core::error::Error for Error {}
