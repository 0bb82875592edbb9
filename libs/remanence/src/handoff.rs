// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Handing the probed [`RegionMap`] from the exclude phase to the compare phase.
//!
//! The map is stored as a flat sequence of little-endian `(start: u64, page_count: u64)`
//! records under [`KEY`]. Everything read back is validated as if it came from an untrusted
//! source: the store may hold a stale value from an older build or a value cut short by a power
//! loss.

use alloc::vec::Vec;
use core::fmt;

use memmap::{MAX_REGIONS, MemoryRegion, PhysicalAddress, RegionMap};

use crate::{BlobStore, ensure};

/// Key under which the map is stored.
pub const KEY: &str = "TestedMemoryMap";
/// Size of a single serialized region.
pub const RECORD_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    /// Nothing is stored under [`KEY`], the exclude phase did not run or the map was consumed.
    Missing,
    /// The stored value is empty.
    Empty,
    /// The length of the stored value is not a multiple of [`RECORD_SIZE`].
    PartialRecord(usize),
    /// The stored value holds more regions than a map can.
    TooManyRecords(usize),
    /// A record describes a malformed region or overlaps a preceding one.
    InvalidRecord { index: usize, source: memmap::Error },
}

impl fmt::Display for HandoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::Missing => write!(f, "no map stored under {KEY}"),
            HandoffError::Empty => write!(f, "stored map is empty"),
            HandoffError::PartialRecord(len) => write!(
                f,
                "stored map length {len} is not a multiple of {RECORD_SIZE} bytes"
            ),
            HandoffError::TooManyRecords(n) => write!(
                f,
                "stored map holds {n} regions, at most {MAX_REGIONS} are supported"
            ),
            HandoffError::InvalidRecord { index, source } => {
                write!(f, "record {index} is invalid: {source}")
            }
        }
    }
}

impl core::error::Error for HandoffError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            HandoffError::InvalidRecord { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[must_use]
pub fn encode(map: &RegionMap) -> Vec<u8> {
    let mut buf = Vec::with_capacity(map.len() * RECORD_SIZE);
    for region in map {
        buf.extend_from_slice(&region.start.get().to_le_bytes());
        buf.extend_from_slice(&region.page_count.to_le_bytes());
    }
    buf
}

/// Parses and validates a map produced by [`encode`].
///
/// # Errors
///
/// Returns an error if `bytes` is not a whole number of records, holds too many records, or if
/// the regions it describes violate any of the [`RegionMap`] invariants.
pub fn decode(bytes: &[u8]) -> Result<RegionMap, HandoffError> {
    ensure!(!bytes.is_empty(), HandoffError::Empty);
    ensure!(
        bytes.len() % RECORD_SIZE == 0,
        HandoffError::PartialRecord(bytes.len())
    );

    let records = bytes.len() / RECORD_SIZE;
    ensure!(
        records <= MAX_REGIONS,
        HandoffError::TooManyRecords(records)
    );

    let mut map = RegionMap::new();
    for (index, record) in bytes.chunks_exact(RECORD_SIZE).enumerate() {
        let (start, page_count) = record.split_at(8);
        let region = MemoryRegion::new(
            PhysicalAddress::new(u64_le(start)),
            u64_le(page_count),
        );

        map.push(region)
            .map_err(|source| HandoffError::InvalidRecord { index, source })?;
    }

    Ok(map)
}

fn u64_le(bytes: &[u8]) -> u64 {
    let mut buf = [0; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// Stores the map for the compare phase.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn persist(store: &mut impl BlobStore, map: &RegionMap) -> crate::Result<()> {
    store.persist(KEY, &encode(map))?;
    log::debug!("persisted {} regions under {KEY}", map.len());
    Ok(())
}

/// Reads back and validates the map stored by [`persist`].
///
/// # Errors
///
/// Returns an error if the store fails, nothing is stored, or the stored value is corrupt.
pub fn load(store: &mut impl BlobStore) -> crate::Result<RegionMap> {
    let Some(bytes) = store.read(KEY)? else {
        crate::bail!(HandoffError::Missing, "no tested memory map found, run the exclude phase first");
    };

    let map = decode(&bytes)?;
    log::debug!("loaded {} regions from {KEY}", map.len());
    Ok(map)
}

/// Erases the stored map so a subsequent compare can not run against stale state.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn invalidate(store: &mut impl BlobStore) -> crate::Result<()> {
    store.erase(KEY)
}
