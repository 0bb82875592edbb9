// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Core of the RAM data remanence tester.
//!
//! A test is made up of three phases, each run in its own boot:
//!
//! 1. [`pass::write`] fills every page of the [`RegionMap`] with a pattern derived from the page's
//!    physical address.
//! 2. After a warm reboot, [`pass::probe`] finds the pages the firmware overwrote while booting
//!    and excludes them from the map. The resulting map is handed to the next phase through a
//!    [`BlobStore`] (see [`handoff`]).
//! 3. After the machine was powered off for the duration under test, [`pass::compare`] counts
//!    the bits that decayed into [`BitStatistics`] which are then written out through a
//!    [`ResultSink`].
//!
//! Everything touching the platform is reached through the traits in [`platform`] so the passes
//! can be exercised against emulated memory on the host.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod error;
pub mod handoff;
pub mod inventory;
mod mode;
pub mod pass;
pub mod platform;
pub mod report;
mod stats;
#[cfg(feature = "test_utils")]
pub mod test_utils;

pub use error::{Error, Operation};
pub use memmap::{PhysicalAddress, RegionMap};
pub use mode::{Action, Mode, UnknownVariant};
pub use platform::{BlobStore, Console, MemoryInventory, PhysicalMemory, Progress, ResultSink};
pub use report::Metadata;
pub use stats::{BitStatistics, Table};

pub type Result<T> = core::result::Result<T, Error>;

/// Number of bits in a memory word, the unit patterns are written and compared in.
pub const WORD_BITS: usize = u64::BITS as usize;
