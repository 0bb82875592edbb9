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
use crate::{PhysicalMemory, Progress};

/// Fills every page of `map` with its pattern.
pub fn write(map: &RegionMap, memory: &mut impl PhysicalMemory, progress: &mut impl Progress) {
    let mut tracker = Tracker::new(progress, map.total_pages());
    let mut lfsr = Lfsr::from_seed(0);
    let mut buf: Page = [0; WORDS_PER_PAGE];

    for region in map {
        log::debug!("writing pattern to {region}");

        for page in region.pages() {
            lfsr.fill_page(page.get(), &mut buf);
            memory.write_page(page, &buf);
            tracker.page_done();
        }
    }
}
