// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use lfsr::{Lfsr, WORDS_PER_PAGE};
use memmap::RegionMap;

use crate::pass::Tracker;
use crate::platform::Page;
use crate::{BitStatistics, BlobStore, PhysicalMemory, Progress, handoff};

/// Loads the map persisted by the exclude phase, compares it and erases it from `store`.
///
/// The map is erased once the comparison completes and before any result is written, a later
/// boot never compares the same memory a second time.
///
/// # Errors
///
/// Returns an error if no map is stored, the stored map is corrupt, or `store` fails.
pub fn compare_stored(
    store: &mut impl BlobStore,
    memory: &impl PhysicalMemory,
    progress: &mut impl Progress,
) -> crate::Result<BitStatistics> {
    let map = handoff::load(store)?;
    log::info!(
        "comparing {} pages in {} regions",
        map.total_pages(),
        map.len()
    );

    let stats = compare(&map, memory, progress);
    handoff::invalidate(store)?;
    Ok(stats)
}

/// Compares every page of `map` against its pattern and counts the flipped bits.
pub fn compare(
    map: &RegionMap,
    memory: &impl PhysicalMemory,
    progress: &mut impl Progress,
) -> BitStatistics {
    let mut tracker = Tracker::new(progress, map.total_pages());
    let mut stats = BitStatistics::new();
    let mut lfsr = Lfsr::from_seed(0);
    let mut buf: Page = [0; WORDS_PER_PAGE];

    for region in map {
        log::debug!("comparing {region}");

        for page in region.pages() {
            memory.read_page(page, &mut buf);
            lfsr.reseed(page.get());

            for actual in &buf {
                stats.record(lfsr.next_word(), *actual);
            }
            tracker.page_done();
        }
    }

    stats.finish();
    stats
}
