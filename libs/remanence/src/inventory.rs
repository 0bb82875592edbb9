// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use memmap::{Policy, RegionMap};

use crate::MemoryInventory;

/// Queries the memory inventory and normalizes it into the map of memory to test.
///
/// # Errors
///
/// Returns an error if the inventory can not be queried or does not normalize into a valid map.
pub fn tested_memory(
    inventory: &mut impl MemoryInventory,
    policy: &Policy,
) -> crate::Result<RegionMap> {
    let raw = inventory.raw_regions()?;
    let (map, report) = memmap::normalize(&raw, policy)?;

    log::debug!("{} descriptors: {report:?}", raw.len());
    for region in &map {
        log::info!(
            "Available RAM [{:#016x} - {:#016x}]",
            region.start,
            region.end().sub(1)
        );
    }
    log::info!(
        "Found {} pages of available RAM ({} MB)",
        map.total_pages(),
        map.total_bytes() >> 20
    );

    Ok(map)
}

/// Normalizes the memory inventory again and compares it to `expected`.
///
/// The inventory is expected to be identical between two queries of the same boot. Any
/// difference means the firmware allocated or released memory under our feet, which makes the
/// results of this boot suspicious. Returns `true` if the inventory is unchanged.
///
/// # Errors
///
/// Returns an error if the inventory can not be queried or does not normalize into a valid map.
pub fn check_drift(
    inventory: &mut impl MemoryInventory,
    policy: &Policy,
    expected: &RegionMap,
) -> crate::Result<bool> {
    let raw = inventory.raw_regions()?;
    let (current, _) = memmap::normalize(&raw, policy)?;

    let diff = expected.diff(&current);
    for region in diff.removed() {
        log::warn!("region {region} is no longer available");
    }
    for region in diff.added() {
        log::warn!("region {region} became available");
    }

    Ok(diff.is_empty())
}
