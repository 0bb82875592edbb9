// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `proptest` strategies for region map tests

extern crate std;

use core::ops::Range;
use std::vec::Vec;

use proptest::prelude::{Strategy, any};

use crate::{MemoryRegion, PAGE_SIZE, PhysicalAddress, RawRegion, RegionKind, RegionMap};

/// Produces a firmware inventory of *non-overlapping* descriptors in ascending address order,
/// mixing conventional and other memory with arbitrary (page granular) sizes and gaps.
pub fn inventory(num_entries: Range<usize>) -> impl Strategy<Value = Vec<RawRegion>> {
    proptest::collection::vec(
        (
            any::<bool>(),
            // size in pages, up to 4 GiB
            1u64..=0x10_0000,
            // gap before the descriptor in pages, up to 256 MiB
            0u64..=0x1_0000,
        ),
        num_entries,
    )
    .prop_map(|entries| {
        let mut next = 0;
        entries
            .into_iter()
            .map(|(conventional, page_count, gap)| {
                let start = next + gap * PAGE_SIZE;
                next = start + page_count * PAGE_SIZE;

                RawRegion {
                    kind: if conventional {
                        RegionKind::Conventional
                    } else {
                        RegionKind::Other(7)
                    },
                    start: PhysicalAddress::new(start),
                    page_count,
                }
            })
            .collect()
    })
}

/// Produces a valid [`RegionMap`] with the given number of entries. Entries are *not* sorted by
/// address, just like the maps built from real firmware inventories.
pub fn map(num_entries: Range<usize>) -> impl Strategy<Value = RegionMap> {
    proptest::collection::vec((1u64..=0x4000, 0u64..=0x100), num_entries)
        .prop_map(|entries| {
            let mut next = 0;
            entries
                .into_iter()
                .map(|(page_count, gap)| {
                    let start = next + gap * PAGE_SIZE;
                    next = start + page_count * PAGE_SIZE;
                    MemoryRegion::new(PhysicalAddress::new(start), page_count)
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
        .prop_map(|regions| RegionMap::from_regions(regions).unwrap())
}

/// Produces a map together with an entry index and a page range fully contained in that entry.
pub fn exclusion(
    num_entries: Range<usize>,
) -> impl Strategy<Value = (RegionMap, usize, PhysicalAddress, u64)> {
    map(num_entries)
        .prop_flat_map(|map| {
            let len = map.len();
            (proptest::strategy::Just(map), 0..len)
        })
        .prop_flat_map(|(map, index)| {
            let pages = map.get(index).unwrap().page_count;
            (proptest::strategy::Just(map), proptest::strategy::Just(index), 0..pages)
        })
        .prop_flat_map(|(map, index, first)| {
            let pages = map.get(index).unwrap().page_count;
            (
                proptest::strategy::Just(map),
                proptest::strategy::Just(index),
                proptest::strategy::Just(first),
                1..=pages - first,
            )
        })
        .prop_map(|(map, index, first, count)| {
            let base = map.get(index).unwrap().page(first);
            (map, index, base, count)
        })
}
