// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use lfsr::{Lfsr, WORDS_PER_PAGE};
use memmap::{Exclusion, PhysicalAddress, RegionMap};

use crate::pass::Tracker;
use crate::platform::Page;
use crate::{PhysicalMemory, Progress};

/// What [`probe`] removed from the map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSummary {
    /// Number of runs of contiguous mismatching pages.
    pub runs: usize,
    /// Number of pages excluded in total.
    pub pages: u64,
}

/// A run of contiguous mismatching pages inside the entry currently being scanned.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: PhysicalAddress,
    pages: u64,
}

/// Finds the pages that no longer hold their pattern and excludes them from `map`.
///
/// Meant to run right after a warm reboot: whatever changed since [`super::write`] was changed
/// by the firmware, and can not be used to measure decay.
///
/// # Errors
///
/// Returns an error if an exclusion fails, because the map is full and an entry needs to be split
/// or because the only remaining entry would have to be removed entirely.
pub fn probe(
    map: &mut RegionMap,
    memory: &impl PhysicalMemory,
    progress: &mut impl Progress,
) -> crate::Result<ProbeSummary> {
    let mut tracker = Tracker::new(progress, map.total_pages());
    let mut summary = ProbeSummary::default();
    let mut lfsr = Lfsr::from_seed(0);
    let mut buf: Page = [0; WORDS_PER_PAGE];

    let mut index = 0;
    while let Some(region) = map.get(index).copied() {
        log::debug!("probing {region}");

        // index of the entry holding the remainder of `region` that is still to be scanned
        let mut current = index;
        let mut run: Option<Run> = None;

        for page in region.pages() {
            memory.read_page(page, &mut buf);
            lfsr.reseed(page.get());
            let matches = buf.iter().all(|word| *word == lfsr.next_word());
            tracker.page_done();

            if !matches {
                run.get_or_insert(Run {
                    start: page,
                    pages: 0,
                })
                .pages += 1;
            } else if let Some(run) = run.take() {
                // a matching page follows, so the entry can not be removed entirely
                if exclude(map, current, run, &mut summary)? == Exclusion::Split {
                    current += 1;
                }
            }
        }

        let removed = match run {
            Some(run) => exclude(map, current, run, &mut summary)? == Exclusion::Removed,
            None => false,
        };

        // the successor of a removed entry moved into its slot
        index = if removed { current } else { current + 1 };
    }

    log::info!(
        "excluded {} pages in {} runs, {} pages remain",
        summary.pages,
        summary.runs,
        map.total_pages()
    );

    Ok(summary)
}

fn exclude(
    map: &mut RegionMap,
    index: usize,
    run: Run,
    summary: &mut ProbeSummary,
) -> crate::Result<Exclusion> {
    let exclusion = map.exclude(index, run.start, run.pages)?;
    log::debug!(
        "excluding {} modified pages at {}: {exclusion:?}",
        run.pages,
        run.start
    );

    summary.runs += 1;
    summary.pages += run.pages;
    Ok(exclusion)
}

#[cfg(test)]
mod tests {
    use memmap::MemoryRegion;

    use super::*;
    use crate::pass::write;
    use crate::test_utils::EmulatedMemory;

    fn region(start: u64, page_count: u64) -> MemoryRegion {
        MemoryRegion::new(PhysicalAddress::new(start), page_count)
    }

    fn written(map: &RegionMap) -> EmulatedMemory {
        let mut memory = EmulatedMemory::new();
        write(map, &mut memory, &mut |_: u64| {});
        memory
    }

    #[test_log::test]
    fn untouched_memory_is_kept() {
        let mut map = RegionMap::from_regions([region(0x10_0000, 64), region(0x0, 16)]).unwrap();
        let memory = written(&map);
        let before = map.clone();

        let summary = probe(&mut map, &memory, &mut |_: u64| {}).unwrap();
        assert_eq!(summary, ProbeSummary::default());
        assert_eq!(map, before);
    }

    #[test_log::test]
    fn every_shape_of_run() {
        let mut map = RegionMap::from_regions([
            region(0x10_0000, 16),
            region(0x20_0000, 16),
            region(0x30_0000, 4),
        ])
        .unwrap();
        let mut memory = written(&map);

        // entry 0: head, two runs in the middle and the tail
        memory.corrupt_page(PhysicalAddress::new(0x10_0000));
        memory.corrupt_page(PhysicalAddress::new(0x10_4000));
        memory.corrupt_page(PhysicalAddress::new(0x10_5000));
        memory.corrupt_page(PhysicalAddress::new(0x10_9000));
        memory.corrupt_page(PhysicalAddress::new(0x10_f000));
        // entry 2: everything
        for page in region(0x30_0000, 4).pages() {
            memory.corrupt_page(page);
        }

        let summary = probe(&mut map, &memory, &mut |_: u64| {}).unwrap();

        assert_eq!(
            summary,
            ProbeSummary {
                runs: 5,
                pages: 9
            }
        );
        assert_eq!(
            map.as_slice(),
            [
                region(0x10_1000, 3),
                region(0x10_6000, 3),
                region(0x10_a000, 5),
                region(0x20_0000, 16),
            ]
        );
        assert_eq!(map.total_pages(), 27);
    }

    #[test]
    fn whole_map_modified() {
        let mut map = RegionMap::from_regions([region(0x10_0000, 2)]).unwrap();
        let mut memory = written(&map);
        memory.corrupt_page(PhysicalAddress::new(0x10_0000));
        memory.corrupt_page(PhysicalAddress::new(0x10_1000));

        assert_eq!(
            probe(&mut map, &memory, &mut |_: u64| {}),
            Err(crate::Error::Map(memmap::Error::LastRegion))
        );
    }
}
