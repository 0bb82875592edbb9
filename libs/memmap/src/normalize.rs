// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Turns the firmware's memory inventory into a stable [`RegionMap`].
//!
//! Firmware memory maps jitter: two queries made a few seconds apart (or across a reboot) rarely
//! describe exactly the same ranges. The policy implemented here gives up a bit of testable memory
//! to get a map that stays the same between the phases of a test:
//!
//! 1. only conventional (free) memory is considered,
//! 2. regions below [`MIN_REGION_PAGES`] are dropped, small regions come and go between boots,
//! 3. regions starting between our own image and the 4 GiB boundary are dropped, this is where
//!    firmware keeps its scratch memory,
//! 4. the start is aligned up and the end aligned down to [`REGION_ALIGNMENT`].

use crate::{
    Error, FIRMWARE_CEILING, MAX_INVENTORY_ENTRIES, MIN_REGION_PAGES, MemoryRegion, PAGE_SIZE,
    PhysicalAddress, REGION_ALIGNMENT, RegionMap,
};

/// The type of memory a firmware descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Free memory not used by the firmware or any loaded image.
    Conventional,
    /// Anything else, carrying the raw firmware type for diagnostics.
    Other(u32),
}

/// A memory range as reported by the firmware's memory inventory, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRegion {
    pub kind: RegionKind,
    pub start: PhysicalAddress,
    pub page_count: u64,
}

impl RawRegion {
    #[must_use]
    pub const fn conventional(start: PhysicalAddress, page_count: u64) -> Self {
        Self {
            kind: RegionKind::Conventional,
            start,
            page_count,
        }
    }
}

/// Tunables of the normalization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Address of a routine inside the running image. Regions starting above this address but
    /// below [`Policy::firmware_ceiling`] are skipped.
    pub load_address: PhysicalAddress,
    pub firmware_ceiling: PhysicalAddress,
    pub alignment: u64,
    pub min_pages: u64,
}

impl Policy {
    #[must_use]
    pub const fn new(load_address: PhysicalAddress) -> Self {
        Self {
            load_address,
            firmware_ceiling: FIRMWARE_CEILING,
            alignment: REGION_ALIGNMENT,
            min_pages: MIN_REGION_PAGES,
        }
    }
}

/// Counts of descriptors accepted and discarded, per rule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub accepted: usize,
    pub not_conventional: usize,
    pub too_small: usize,
    pub near_firmware: usize,
    pub too_small_aligned: usize,
}

/// Builds a fresh [`RegionMap`] from the raw memory inventory.
///
/// # Errors
///
/// Returns an error if the inventory holds more than [`MAX_INVENTORY_ENTRIES`] descriptors, if a
/// descriptor does not fit the physical address space, or if the normalized regions overflow the
/// map or overlap each other.
pub fn normalize(raw: &[RawRegion], policy: &Policy) -> crate::Result<(RegionMap, Report)> {
    if raw.len() > MAX_INVENTORY_ENTRIES {
        return Err(Error::TooManyDescriptors(raw.len()));
    }

    let mut map = RegionMap::new();
    let mut report = Report::default();

    for desc in raw {
        if desc.kind != RegionKind::Conventional {
            report.not_conventional += 1;
            continue;
        }

        if desc.page_count < policy.min_pages {
            log::trace!("skipping {desc:?}: smaller than {} pages", policy.min_pages);
            report.too_small += 1;
            continue;
        }

        if desc.start < policy.firmware_ceiling && desc.start > policy.load_address {
            log::trace!("skipping {desc:?}: between image and firmware ceiling");
            report.near_firmware += 1;
            continue;
        }

        let Some(region) = align_in(desc, policy)? else {
            log::trace!("skipping {desc:?}: too small after alignment");
            report.too_small_aligned += 1;
            continue;
        };

        log::debug!("available RAM {region}");
        map.push(region)?;
        report.accepted += 1;
    }

    Ok((map, report))
}

/// Shrinks a descriptor to the largest aligned region it contains.
///
/// Returns `Ok(None)` if what remains is smaller than the policy minimum.
fn align_in(desc: &RawRegion, policy: &Policy) -> crate::Result<Option<MemoryRegion>> {
    let invalid = || Error::InvalidDescriptor {
        start: desc.start,
        page_count: desc.page_count,
    };

    let end = desc
        .page_count
        .checked_mul(PAGE_SIZE)
        .and_then(|len| desc.start.checked_add(len))
        .ok_or_else(invalid)?;

    let start = desc
        .start
        .checked_align_up(policy.alignment)
        .ok_or_else(invalid)?;
    let end = end.align_down(policy.alignment);

    if end <= start {
        return Ok(None);
    }

    let page_count = end.offset_from_unsigned(start) / PAGE_SIZE;
    if page_count < policy.min_pages {
        return Ok(None);
    }

    Ok(Some(MemoryRegion::new(start, page_count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_REGIONS;

    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * MIB;
    // pretend the image was loaded at 3 GiB
    const POLICY: Policy = Policy::new(PhysicalAddress::new(3 * GIB));

    fn conventional(start: u64, page_count: u64) -> RawRegion {
        RawRegion::conventional(PhysicalAddress::new(start), page_count)
    }

    #[test_log::test]
    fn keeps_aligned_regions() {
        let (map, report) = normalize(&[conventional(0x0200_0000, 8192)], &POLICY).unwrap();

        assert_eq!(
            map.as_slice(),
            [MemoryRegion::new(PhysicalAddress::new(0x0200_0000), 8192)]
        );
        assert_eq!(map.total_pages(), 8192);
        assert_eq!(report.accepted, 1);
    }

    #[test_log::test]
    fn aligns_start_up_and_end_down() {
        // starts 4 KiB into a 16 MiB block, ends 4 KiB into another one
        let raw = conventional(16 * MIB + 0x1000, 3 * 4096);
        let (map, _) = normalize(&[raw], &POLICY).unwrap();

        assert_eq!(
            map.as_slice(),
            [MemoryRegion::new(PhysicalAddress::new(32 * MIB), 2 * 4096)]
        );
    }

    #[test_log::test]
    fn drops_regions_by_rule() {
        let raw = [
            RawRegion {
                kind: RegionKind::Other(3),
                start: PhysicalAddress::new(0x0200_0000),
                page_count: 8192,
            },
            // 16 MiB minus one page
            conventional(0x0200_0000, 4095),
            // above the image, below 4 GiB
            conventional(3 * GIB + 16 * MIB, 8192),
            // large enough, but not once aligned
            conventional(0x0100_1000, 4096 + 100),
            // above the firmware ceiling, kept
            conventional(4 * GIB, 4096),
        ];

        let (map, report) = normalize(&raw, &POLICY).unwrap();

        assert_eq!(
            map.as_slice(),
            [MemoryRegion::new(PhysicalAddress::new(4 * GIB), 4096)]
        );
        assert_eq!(
            report,
            Report {
                accepted: 1,
                not_conventional: 1,
                too_small: 1,
                near_firmware: 1,
                too_small_aligned: 1,
            }
        );
    }

    #[test]
    fn region_at_load_address_is_kept() {
        // the heuristic only skips regions strictly above the image
        let policy = Policy::new(PhysicalAddress::new(0x0200_0000));
        let (map, _) = normalize(&[conventional(0x0200_0000, 4096)], &policy).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn rejects_oversized_inventory() {
        let raw = vec![conventional(0, 1); MAX_INVENTORY_ENTRIES + 1];
        assert_eq!(
            normalize(&raw, &POLICY).unwrap_err(),
            Error::TooManyDescriptors(MAX_INVENTORY_ENTRIES + 1)
        );
    }

    #[test]
    fn more_regions_than_the_map_holds() {
        let count = u64::try_from(MAX_REGIONS).unwrap() + 1;
        let raw: Vec<_> = (0..count)
            .map(|i| conventional(4 * GIB + i * 0x200_0000, 4096))
            .collect();
        assert_eq!(raw.len(), 201);

        assert_eq!(normalize(&raw, &POLICY), Err(Error::CapacityExceeded));

        // one less fits exactly
        let (map, report) = normalize(&raw[..MAX_REGIONS], &POLICY).unwrap();
        assert_eq!(map.len(), MAX_REGIONS);
        assert_eq!(report.accepted, MAX_REGIONS);
    }

    #[test]
    fn rejects_descriptor_past_address_space() {
        let raw = conventional(u64::MAX - 0xfff, 8192);
        assert!(matches!(
            normalize(&[raw], &POLICY),
            Err(Error::InvalidDescriptor { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn normalized_regions_are_aligned(
            raw in crate::test_utils::inventory(0..64)
        ) {
            let (map, _) = normalize(&raw, &POLICY).unwrap();

            for region in &map {
                proptest::prop_assert!(region.start.is_aligned_to(REGION_ALIGNMENT));
                proptest::prop_assert_eq!(region.page_count % MIN_REGION_PAGES, 0);
                proptest::prop_assert!(region.page_count > 0);
            }
            proptest::prop_assert_eq!(
                map.total_pages(),
                map.iter().map(|r| r.page_count).sum::<u64>()
            );
        }
    }
}
