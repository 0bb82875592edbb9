// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Services the tester needs from the platform it runs on.

use alloc::vec::Vec;

use lfsr::WORDS_PER_PAGE;
use memmap::{PhysicalAddress, RawRegion};

use crate::report::Metadata;

/// A page of memory, as seen by the passes.
pub type Page = [u64; WORDS_PER_PAGE];

/// Page granular access to physical memory.
///
/// Implementations must access memory directly, bypassing any caching layer that would hide the
/// actual content of DRAM from the passes. Addresses are always page aligned and inside a region
/// of the map the pass operates on.
pub trait PhysicalMemory {
    /// Copies the page at `page` into `buf`.
    fn read_page(&self, page: PhysicalAddress, buf: &mut Page);

    /// Overwrites the page at `page` with `buf`.
    fn write_page(&mut self, page: PhysicalAddress, buf: &Page);
}

/// The firmware's description of physical memory.
pub trait MemoryInventory {
    /// Returns all memory descriptors, in firmware enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Platform`] if the inventory could not be retrieved.
    fn raw_regions(&mut self) -> crate::Result<Vec<RawRegion>>;
}

/// Key-value storage that survives a power cycle.
pub trait BlobStore {
    /// Stores `data` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Platform`] if the value could not be stored.
    fn persist(&mut self, key: &str, data: &[u8]) -> crate::Result<()>;

    /// Reads the value stored under `key`, `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Platform`] if the store could not be read.
    fn read(&mut self, key: &str) -> crate::Result<Option<Vec<u8>>>;

    /// Removes the value stored under `key`. Erasing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Platform`] if the value could not be removed.
    fn erase(&mut self, key: &str) -> crate::Result<()>;
}

pub trait Console {
    /// Blocks until a key is pressed and returns its character.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Platform`] if reading from the input device failed.
    fn read_key(&mut self) -> crate::Result<char>;
}

/// Sink for the progress of a pass, in percent.
pub trait Progress {
    fn report(&mut self, percent: u64);
}

impl<F: FnMut(u64)> Progress for F {
    fn report(&mut self, percent: u64) {
        self(percent);
    }
}

/// Persistence of the comparison results.
///
/// [`ResultSink::append_record`] is called once per bit, in ascending bit order, followed by a
/// single call to [`ResultSink::finalize`].
pub trait ResultSink {
    /// # Errors
    ///
    /// Returns [`crate::Error::Platform`] if the record could not be written.
    fn append_record(&mut self, bit: u32, zero_to_one: u64, one_to_zero: u64)
    -> crate::Result<()>;

    /// # Errors
    ///
    /// Returns [`crate::Error::Platform`] if the summary could not be written or the results
    /// could not be made durable.
    fn finalize(
        &mut self,
        differing_bits: u64,
        compared_bits: u64,
        metadata: &Metadata,
    ) -> crate::Result<()>;
}
