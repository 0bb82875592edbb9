// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end runs of the three phases against emulated memory.

use memmap::{MemoryRegion, PAGE_SIZE, PhysicalAddress, RegionMap};
use remanence::report::{CsvWriter, ResultFile};
use remanence::test_utils::{EmulatedMemory, MemoryStore};
use remanence::{Error, Metadata, handoff, pass};

fn region(start: u64, page_count: u64) -> MemoryRegion {
    MemoryRegion::new(PhysicalAddress::new(start), page_count)
}

fn no_progress(_: u64) {}

#[test_log::test]
fn untouched_memory_compares_clean() {
    let map = RegionMap::from_regions([region(0x0200_0000, 4096)]).unwrap();
    let mut memory = EmulatedMemory::new();

    pass::write(&map, &mut memory, &mut no_progress);
    let stats = pass::compare(&map, &memory, &mut no_progress);

    assert_eq!(stats.differing_bits(), 0);
    assert_eq!(stats.compared_bits(), 4096 * 4096 * 8);
}

#[test_log::test]
fn single_flipped_bit() {
    let map = RegionMap::from_regions([region(0x0200_0000, 4096)]).unwrap();
    let mut memory = EmulatedMemory::new();

    pass::write(&map, &mut memory, &mut no_progress);
    let first_word = PhysicalAddress::new(0x0200_0000);
    let was_set = memory.read_word(first_word) & (1 << 5) != 0;
    memory.flip_bit(first_word, 5);

    let stats = pass::compare(&map, &memory, &mut no_progress);

    assert_eq!(stats.differing_bits(), 1);
    for bit in 0..64 {
        let (zero_to_one, one_to_zero) = match (bit, was_set) {
            (5, true) => (0, 1),
            (5, false) => (1, 0),
            _ => (0, 0),
        };
        assert_eq!(stats.zero_to_one()[bit], zero_to_one, "bit {bit}");
        assert_eq!(stats.one_to_zero()[bit], one_to_zero, "bit {bit}");
    }
}

#[test_log::test]
fn firmware_modified_pages_are_excluded() {
    let mut map = RegionMap::from_regions([region(0x0400_0000, 8192)]).unwrap();
    let mut memory = EmulatedMemory::new();

    pass::write(&map, &mut memory, &mut no_progress);
    for page in 2..=4 {
        memory.write_word(PhysicalAddress::new(0x0400_0000 + page * PAGE_SIZE + 0x18), 0);
    }

    let summary = pass::probe(&mut map, &memory, &mut no_progress).unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.runs, 1);
    assert_eq!(map.total_pages(), 8192 - 3);
    assert_eq!(
        map.as_slice(),
        [region(0x0400_0000, 2), region(0x0400_5000, 8187)]
    );

    // the excluded pages no longer count towards the comparison
    let stats = pass::compare(&map, &memory, &mut no_progress);
    assert_eq!(stats.differing_bits(), 0);
    assert_eq!(stats.compared_bits(), (8192 - 3) * PAGE_SIZE * 8);
}

#[test_log::test]
fn three_phases() {
    let initial = RegionMap::from_regions([
        region(0x1_0000_0000, 512),
        region(0x0100_0000, 256),
    ])
    .unwrap();
    let mut memory = EmulatedMemory::new();
    let mut store = MemoryStore::default();

    // phase 1
    pass::write(&initial, &mut memory, &mut no_progress);

    // phase 2, the firmware used a few pages while rebooting
    memory.corrupt_page(PhysicalAddress::new(0x0100_0000));
    memory.corrupt_page(PhysicalAddress::new(0x1_0000_0000 + 100 * PAGE_SIZE));
    let mut map = initial.clone();
    pass::probe(&mut map, &memory, &mut no_progress).unwrap();
    handoff::persist(&mut store, &map).unwrap();

    // phase 3, some bits decayed while the machine was off
    memory.flip_bit(PhysicalAddress::new(0x1_0000_0000 + 0x10), 63);
    memory.flip_bit(PhysicalAddress::new(0x0100_2000), 0);

    let map = handoff::load(&mut store).unwrap();
    assert_eq!(map.total_pages(), 512 + 256 - 2);

    let mut progress = Vec::new();
    let stats = pass::compare(&map, &memory, &mut |p: u64| progress.push(p));
    handoff::invalidate(&mut store).unwrap();

    assert_eq!(stats.differing_bits(), 2);
    assert_eq!(stats.compared_bits(), (512 + 256 - 2) * PAGE_SIZE * 8);
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] < w[1]));

    let mut writer = CsvWriter::new(String::new());
    stats.emit(&mut writer, &Metadata::new()).unwrap();
    let file = ResultFile::parse(&writer.into_inner()).unwrap();
    assert_eq!(file.differing_bits, 2);
    assert_eq!(file.bits[63].total() + file.bits[0].total(), 2);

    // the map is consumed, a second compare has nothing to work with
    assert!(matches!(
        handoff::load(&mut store),
        Err(Error::Handoff(handoff::HandoffError::Missing))
    ));
}

#[test_log::test]
fn stored_map_is_erased_once_compared() {
    let map = RegionMap::from_regions([region(0x0300_0000, 4), region(0x0500_0000, 2)]).unwrap();
    let mut memory = EmulatedMemory::new();
    let mut store = MemoryStore::default();

    pass::write(&map, &mut memory, &mut no_progress);
    assert_eq!(memory.resident_pages(), 6);
    handoff::persist(&mut store, &map).unwrap();
    memory.flip_bit(PhysicalAddress::new(0x0500_1008), 17);

    let stats = pass::compare_stored(&mut store, &memory, &mut no_progress).unwrap();

    // nothing has been written anywhere yet, the map is already gone
    assert!(store.blobs.is_empty());
    assert_eq!(stats.differing_bits(), 1);
    assert_eq!(stats.compared_bits(), 6 * PAGE_SIZE * 8);
    // reading pages never materializes them
    assert_eq!(memory.resident_pages(), 6);

    assert!(matches!(
        pass::compare_stored(&mut store, &memory, &mut no_progress),
        Err(Error::Handoff(handoff::HandoffError::Missing))
    ));
}

#[test]
fn store_failures_propagate() {
    let map = RegionMap::from_regions([region(0x0200_0000, 1)]).unwrap();
    let mut store = MemoryStore {
        fail: true,
        ..MemoryStore::default()
    };

    assert!(matches!(
        handoff::persist(&mut store, &map),
        Err(Error::Platform { .. })
    ));
    assert!(matches!(
        handoff::load(&mut store),
        Err(Error::Platform { .. })
    ));
}

#[test]
fn corrupt_handoff_is_rejected() {
    let mut store = MemoryStore::default();
    store
        .blobs
        .insert(handoff::KEY.to_string(), vec![0; handoff::RECORD_SIZE + 3]);

    assert_eq!(
        handoff::load(&mut store),
        Err(Error::Handoff(handoff::HandoffError::PartialRecord(19)))
    );
}

proptest::proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(16))]

    #[test]
    fn statistics_are_consistent(
        flips in remanence::test_utils::bit_flips(PhysicalAddress::new(0x0200_0000), 16, 0..32)
    ) {
        let map = RegionMap::from_regions([region(0x0200_0000, 16)]).unwrap();
        let mut memory = EmulatedMemory::new();
        pass::write(&map, &mut memory, &mut no_progress);

        for (address, bit) in &flips {
            memory.flip_bit(*address, *bit);
        }

        let stats = pass::compare(&map, &memory, &mut no_progress);
        let sum: u64 = stats.zero_to_one().iter().chain(stats.one_to_zero()).sum();

        proptest::prop_assert_eq!(stats.differing_bits(), sum);
        proptest::prop_assert_eq!(stats.compared_bits(), map.total_pages() * PAGE_SIZE * 8);
        // flipping the same bit twice restores it
        proptest::prop_assert!(stats.differing_bits() <= flips.len() as u64);
        proptest::prop_assert_eq!(stats.differing_bits() % 2, flips.len() as u64 % 2);
    }
}
