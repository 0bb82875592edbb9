// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;
use core::ops::Range;

use arrayvec::ArrayVec;

use crate::{Error, MAX_REGIONS, PAGE_SIZE, PhysicalAddress};

/// A contiguous, page aligned span of physical memory that is considered safe to test.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRegion {
    /// Physical address of the first byte of the region, always page aligned.
    pub start: PhysicalAddress,
    /// Number of pages in the region, never zero in a [`RegionMap`].
    pub page_count: u64,
}

impl MemoryRegion {
    #[must_use]
    pub const fn new(start: PhysicalAddress, page_count: u64) -> Self {
        Self { start, page_count }
    }

    /// Physical address one past the last byte of the region.
    ///
    /// # Panics
    ///
    /// Panics if the region extends past the end of the physical address space. Regions stored in a
    /// [`RegionMap`] never do.
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.start.add(self.page_count * PAGE_SIZE)
    }

    /// Length of the region in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.page_count * PAGE_SIZE
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.page_count == 0
    }

    #[must_use]
    pub const fn range(&self) -> Range<PhysicalAddress> {
        self.start..self.end()
    }

    /// Returns `true` if there exists an address present in both regions.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Returns `true` if `[base, base + page_count * PAGE_SIZE)` lies completely inside this region.
    #[must_use]
    pub fn contains_pages(&self, base: PhysicalAddress, page_count: u64) -> bool {
        let Some(end) = page_count
            .checked_mul(PAGE_SIZE)
            .and_then(|len| base.checked_add(len))
        else {
            return false;
        };

        self.start <= base && end <= self.end()
    }

    /// Physical address of the page with the given index.
    #[must_use]
    pub const fn page(&self, index: u64) -> PhysicalAddress {
        self.start.add(index * PAGE_SIZE)
    }

    /// Iterates over the physical address of every page in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = PhysicalAddress> + use<> {
        let start = self.start;
        (0..self.page_count).map(move |index| start.add(index * PAGE_SIZE))
    }

    /// A region is well-formed when it is non-empty, page aligned and fits the address space.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.page_count > 0
            && self.start.is_aligned_to(PAGE_SIZE)
            && self
                .page_count
                .checked_mul(PAGE_SIZE)
                .and_then(|len| self.start.checked_add(len))
                .is_some()
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#018x} - {:#018x}]",
            self.start.get(),
            self.start
                .get()
                .wrapping_add(self.page_count.wrapping_mul(PAGE_SIZE))
                .wrapping_sub(1)
        )
    }
}

impl fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("start", &self.start)
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// The ordered set of memory regions under test.
///
/// Entries keep the order in which the firmware enumerated them, they are *not* necessarily
/// sorted by address. The only operation that changes the relative position of entries is a
/// split, which inserts the upper half right after the lower half.
///
/// Invariants upheld by every method:
/// - all entries are well-formed (see [`MemoryRegion`]),
/// - no two entries overlap,
/// - [`RegionMap::total_pages`] is the sum of the page counts of all entries.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    regions: ArrayVec<MemoryRegion, MAX_REGIONS>,
    total_pages: u64,
}

impl RegionMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: ArrayVec::new_const(),
            total_pages: 0,
        }
    }

    /// Builds a map from a sequence of regions, validating every invariant along the way.
    ///
    /// # Errors
    ///
    /// Returns an error if a region is malformed, overlaps a preceding region, or if there are
    /// more than [`MAX_REGIONS`] regions.
    pub fn from_regions(regions: impl IntoIterator<Item = MemoryRegion>) -> crate::Result<Self> {
        let mut map = Self::new();
        for region in regions {
            map.push(region)?;
        }
        Ok(map)
    }

    /// Appends a region to the end of the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is malformed, overlaps an existing entry or the map is full.
    pub fn push(&mut self, region: MemoryRegion) -> crate::Result<()> {
        self.check_insertable(&region)?;
        self.regions
            .try_push(region)
            .map_err(|_| Error::CapacityExceeded)?;
        self.update_total_pages();

        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.regions.is_full()
    }

    /// Sum of the page counts of all entries.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Total number of bytes covered by the map.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_pages * PAGE_SIZE
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MemoryRegion> {
        self.regions.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, MemoryRegion> {
        self.regions.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[MemoryRegion] {
        self.regions.as_slice()
    }

    /// Compares two maps region by region.
    ///
    /// Returns the regions that only appear in `self` and the ones that only appear in `other`.
    /// Two maps built from the same memory inventory produce an empty diff.
    pub fn diff<'a>(&'a self, other: &'a Self) -> MapDiff<'a> {
        MapDiff { a: self, b: other }
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut MemoryRegion> {
        self.regions.get_mut(index)
    }

    /// Inserts `region` at `index`, shifting all following entries up by one slot.
    pub(crate) fn insert(&mut self, index: usize, region: MemoryRegion) -> crate::Result<()> {
        self.regions
            .try_insert(index, region)
            .map_err(|_| Error::CapacityExceeded)?;
        self.update_total_pages();

        Ok(())
    }

    /// Removes the entry at `index`, shifting all following entries down by one slot.
    pub(crate) fn remove(&mut self, index: usize) -> MemoryRegion {
        let region = self.regions.remove(index);
        self.update_total_pages();
        region
    }

    pub(crate) fn update_total_pages(&mut self) {
        self.total_pages = self.regions.iter().map(|region| region.page_count).sum();
    }

    fn check_insertable(&self, region: &MemoryRegion) -> crate::Result<()> {
        if !region.is_well_formed() {
            return Err(Error::InvalidRegion(*region));
        }

        if let Some(existing) = self.regions.iter().find(|existing| existing.overlaps(region)) {
            return Err(Error::Overlap {
                region: *region,
                existing: *existing,
            });
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a RegionMap {
    type Item = &'a MemoryRegion;
    type IntoIter = core::slice::Iter<'a, MemoryRegion>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for RegionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionMap")
            .field("regions", &self.regions)
            .field("total_pages", &self.total_pages)
            .finish()
    }
}

impl fmt::Display for RegionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for region in &self.regions {
            writeln!(f, "{region} {:>10} pages", region.page_count)?;
        }
        write!(
            f,
            "{} pages in {} regions ({} MiB)",
            self.total_pages,
            self.regions.len(),
            self.total_pages >> 8
        )
    }
}

/// Region-wise difference between two maps, see [`RegionMap::diff`].
#[derive(Debug, Clone, Copy)]
pub struct MapDiff<'a> {
    a: &'a RegionMap,
    b: &'a RegionMap,
}

impl<'a> MapDiff<'a> {
    /// Regions present in the first map but not in the second.
    pub fn removed(&self) -> impl Iterator<Item = &'a MemoryRegion> + use<'a> {
        let b = self.b;
        self.a.iter().filter(move |region| !b.regions.contains(region))
    }

    /// Regions present in the second map but not in the first.
    pub fn added(&self) -> impl Iterator<Item = &'a MemoryRegion> + use<'a> {
        let a = self.a;
        self.b.iter().filter(move |region| !a.regions.contains(region))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed().next().is_none() && self.added().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(start: u64, page_count: u64) -> MemoryRegion {
        MemoryRegion::new(PhysicalAddress::new(start), page_count)
    }

    #[test]
    fn push_tracks_total_pages() {
        let mut map = RegionMap::new();
        map.push(region(0x1000_0000, 4096)).unwrap();
        map.push(region(0x0200_0000, 8192)).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.total_pages(), 4096 + 8192);
        // enumeration order is kept
        assert_eq!(map.get(0).unwrap().start, PhysicalAddress::new(0x1000_0000));
    }

    #[test]
    fn push_rejects_malformed() {
        let mut map = RegionMap::new();
        assert_eq!(
            map.push(region(0x1000_0000, 0)),
            Err(Error::InvalidRegion(region(0x1000_0000, 0)))
        );
        assert_eq!(
            map.push(region(0x1000_0800, 1)),
            Err(Error::InvalidRegion(region(0x1000_0800, 1)))
        );
        assert_eq!(
            map.push(region(u64::MAX & !0xfff, 2)),
            Err(Error::InvalidRegion(region(u64::MAX & !0xfff, 2)))
        );
        assert!(map.is_empty());
    }

    #[test]
    fn push_rejects_overlap() {
        let mut map = RegionMap::new();
        map.push(region(0x0200_0000, 4096)).unwrap();

        let err = map.push(region(0x02ff_f000, 2)).unwrap_err();
        assert_eq!(
            err,
            Error::Overlap {
                region: region(0x02ff_f000, 2),
                existing: region(0x0200_0000, 4096),
            }
        );

        // directly adjacent is fine
        map.push(region(0x0300_0000, 1)).unwrap();
    }

    #[test]
    fn capacity_is_bounded() {
        let mut map = RegionMap::new();
        for i in 0..MAX_REGIONS as u64 {
            map.push(region(i * 0x2000, 1)).unwrap();
        }
        assert!(map.is_full());
        assert_eq!(
            map.push(region(0x1_0000_0000, 1)),
            Err(Error::CapacityExceeded)
        );
        assert_eq!(map.total_pages(), MAX_REGIONS as u64);
    }

    #[test]
    fn diff() {
        let a = RegionMap::from_regions([region(0x0200_0000, 4096), region(0x1_0000_0000, 4096)])
            .unwrap();
        let b = RegionMap::from_regions([region(0x0200_0000, 4096), region(0x1_0100_0000, 4096)])
            .unwrap();

        assert!(a.diff(&a.clone()).is_empty());

        let diff = a.diff(&b);
        assert!(!diff.is_empty());
        assert_eq!(
            diff.removed().copied().collect::<Vec<_>>(),
            [region(0x1_0000_0000, 4096)]
        );
        assert_eq!(
            diff.added().copied().collect::<Vec<_>>(),
            [region(0x1_0100_0000, 4096)]
        );
    }

    #[test]
    fn region_helpers() {
        let r = region(0x0400_0000, 8192);
        assert_eq!(r.end(), PhysicalAddress::new(0x0600_0000));
        assert_eq!(r.page(2), PhysicalAddress::new(0x0400_2000));
        assert!(r.contains_pages(PhysicalAddress::new(0x0400_2000), 3));
        assert!(r.contains_pages(PhysicalAddress::new(0x05ff_f000), 1));
        assert!(!r.contains_pages(PhysicalAddress::new(0x05ff_f000), 2));
        assert!(!r.contains_pages(PhysicalAddress::new(0x03ff_f000), 1));
        assert_eq!(r.pages().count(), 8192);
        assert_eq!(format!("{r}"), "[0x0000000004000000 - 0x0000000005ffffff]");
    }
}
