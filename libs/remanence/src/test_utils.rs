// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Host implementations of the platform traits for tests.

extern crate std;

use std::boxed::Box;
use std::collections::BTreeMap;
use std::fmt;
use std::string::{String, ToString};
use std::vec::Vec;

use lfsr::WORDS_PER_PAGE;
use memmap::{PAGE_SIZE, PhysicalAddress, RawRegion};
use proptest::prelude::Strategy;

use crate::platform::Page;
use crate::{BlobStore, Console, Error, MemoryInventory, Operation, PhysicalMemory};

/// Sparse emulation of physical memory. Pages that were never written read as zero.
#[derive(Default, Clone)]
pub struct EmulatedMemory {
    pages: BTreeMap<PhysicalAddress, Box<Page>>,
}

impl EmulatedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn page_mut(&mut self, address: PhysicalAddress) -> &mut Page {
        let page = address.align_down(PAGE_SIZE);
        self.pages
            .entry(page)
            .or_insert_with(|| Box::new([0; WORDS_PER_PAGE]))
    }

    fn word_index(address: PhysicalAddress) -> usize {
        assert!(
            address.is_aligned_to(8),
            "EmulatedMemory: {address} is not word aligned"
        );
        usize::try_from((address.get() % PAGE_SIZE) / 8).unwrap()
    }

    pub fn read_word(&self, address: PhysicalAddress) -> u64 {
        let index = Self::word_index(address);
        self.pages
            .get(&address.align_down(PAGE_SIZE))
            .map_or(0, |page| page[index])
    }

    pub fn write_word(&mut self, address: PhysicalAddress, value: u64) {
        let index = Self::word_index(address);
        self.page_mut(address)[index] = value;
    }

    /// Inverts bit `bit` of the word at `address`.
    pub fn flip_bit(&mut self, address: PhysicalAddress, bit: u32) {
        let index = Self::word_index(address);
        self.page_mut(address)[index] ^= 1 << bit;
    }

    /// Inverts every bit of the page containing `address`, the way firmware scratch data would
    /// overwrite it.
    pub fn corrupt_page(&mut self, address: PhysicalAddress) {
        for word in self.page_mut(address).iter_mut() {
            *word = !*word;
        }
    }

    /// Number of pages that were touched so far.
    pub fn resident_pages(&self) -> usize {
        self.pages.len()
    }
}

impl PhysicalMemory for EmulatedMemory {
    fn read_page(&self, page: PhysicalAddress, buf: &mut Page) {
        assert!(page.is_aligned_to(PAGE_SIZE), "{page} is not page aligned");
        match self.pages.get(&page) {
            Some(content) => buf.copy_from_slice(&content[..]),
            None => buf.fill(0),
        }
    }

    fn write_page(&mut self, page: PhysicalAddress, buf: &Page) {
        assert!(page.is_aligned_to(PAGE_SIZE), "{page} is not page aligned");
        self.page_mut(page).copy_from_slice(buf);
    }
}

impl fmt::Debug for EmulatedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedMemory")
            .field("resident_pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

/// A [`BlobStore`] backed by a map, optionally failing every operation.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub blobs: BTreeMap<String, Vec<u8>>,
    pub fail: bool,
}

impl MemoryStore {
    fn check(&self, operation: Operation) -> crate::Result<()> {
        if self.fail {
            Err(Error::platform(operation, "device error"))
        } else {
            Ok(())
        }
    }
}

impl BlobStore for MemoryStore {
    fn persist(&mut self, key: &str, data: &[u8]) -> crate::Result<()> {
        self.check(Operation::PersistMap)?;
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&mut self, key: &str) -> crate::Result<Option<Vec<u8>>> {
        self.check(Operation::ReadMap)?;
        Ok(self.blobs.get(key).cloned())
    }

    fn erase(&mut self, key: &str) -> crate::Result<()> {
        self.check(Operation::EraseMap)?;
        self.blobs.remove(key);
        Ok(())
    }
}

/// A [`Console`] replaying a fixed sequence of keys.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    keys: Vec<char>,
}

impl ScriptedConsole {
    pub fn new(keys: &str) -> Self {
        Self {
            keys: keys.chars().rev().collect(),
        }
    }
}

impl Console for ScriptedConsole {
    fn read_key(&mut self) -> crate::Result<char> {
        self.keys
            .pop()
            .ok_or_else(|| Error::platform(Operation::ReadKey, "no more keys"))
    }
}

/// A [`MemoryInventory`] returning a fixed set of descriptors.
#[derive(Debug, Default, Clone)]
pub struct StaticInventory(pub Vec<RawRegion>);

impl MemoryInventory for StaticInventory {
    fn raw_regions(&mut self) -> crate::Result<Vec<RawRegion>> {
        Ok(self.0.clone())
    }
}

/// Produces word addresses inside `pages` pages starting at `base` together with a bit index.
pub fn bit_flips(
    base: PhysicalAddress,
    pages: u64,
    num_flips: std::ops::Range<usize>,
) -> impl Strategy<Value = Vec<(PhysicalAddress, u32)>> {
    proptest::collection::vec((0..pages * PAGE_SIZE / 8, 0u32..64), num_flips).prop_map(
        move |flips| {
            flips
                .into_iter()
                .map(|(word, bit)| (base.add(word * 8), bit))
                .collect()
        },
    )
}

