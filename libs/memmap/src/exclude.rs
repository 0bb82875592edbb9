// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::{Error, MemoryRegion, PAGE_SIZE, PhysicalAddress, RegionMap};

/// How [`RegionMap::exclude`] changed the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The whole entry was removed, all following entries moved down by one slot.
    Removed,
    /// The end of the entry was cut off.
    TrimmedTail,
    /// The start of the entry was cut off, the entry now starts after the excluded range.
    TrimmedHead,
    /// The range was in the middle of the entry. The entry now ends before the excluded range and
    /// a new entry starting after the excluded range was inserted right after it.
    Split,
}

impl Exclusion {
    /// Change in the number of map entries caused by the exclusion.
    #[must_use]
    pub const fn entry_delta(self) -> isize {
        match self {
            Exclusion::Removed => -1,
            Exclusion::TrimmedTail | Exclusion::TrimmedHead => 0,
            Exclusion::Split => 1,
        }
    }
}

impl RegionMap {
    /// Removes `page_count` pages starting at `base` from the entry at `index`.
    ///
    /// The four possible cases are checked in order: removing the whole entry, trimming its tail,
    /// trimming its head and finally splitting it in two. Whole-entry removal comes first because
    /// it is a degenerate case of both trims.
    ///
    /// On success the total page count of the map decreased by exactly `page_count`, all other
    /// entries are unchanged and in the same order.
    ///
    /// # Errors
    ///
    /// Returns an error (leaving the map unchanged) if
    /// - there is no entry at `index`,
    /// - the range is empty, not page aligned, or not contained in the entry,
    /// - the range covers the only remaining entry,
    /// - a split is required but the map is full.
    pub fn exclude(
        &mut self,
        index: usize,
        base: PhysicalAddress,
        page_count: u64,
    ) -> crate::Result<Exclusion> {
        let entry = *self.get(index).ok_or(Error::NoSuchEntry(index))?;

        if page_count == 0
            || !base.is_aligned_to(PAGE_SIZE)
            || !entry.contains_pages(base, page_count)
        {
            return Err(Error::OutOfBounds {
                index,
                base,
                page_count,
            });
        }

        let excluded_end = base.add(page_count * PAGE_SIZE);

        let exclusion = if base == entry.start && page_count == entry.page_count {
            if self.len() <= 1 {
                return Err(Error::LastRegion);
            }

            self.remove(index);
            Exclusion::Removed
        } else if excluded_end == entry.end() {
            self.update_entry(index, |region| region.page_count -= page_count);
            Exclusion::TrimmedTail
        } else if base == entry.start {
            self.update_entry(index, |region| {
                region.page_count -= page_count;
                region.start = excluded_end;
            });
            Exclusion::TrimmedHead
        } else {
            if self.is_full() {
                return Err(Error::CapacityExceeded);
            }

            let head_pages = base.offset_from_unsigned(entry.start) / PAGE_SIZE;
            let tail = MemoryRegion::new(excluded_end, entry.page_count - page_count - head_pages);

            self.insert(index + 1, tail)?;
            self.update_entry(index, |region| region.page_count = head_pages);
            Exclusion::Split
        };

        log::trace!(
            "excluded {page_count} pages at {base} from entry {index} ({exclusion:?}), {} pages left",
            self.total_pages()
        );

        Ok(exclusion)
    }

    fn update_entry(&mut self, index: usize, f: impl FnOnce(&mut MemoryRegion)) {
        if let Some(region) = self.get_mut(index) {
            f(region);
        }
        self.update_total_pages();
    }
}
