// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Reproducible 64-bit test pattern generator.
//!
//! The pattern is produced by a 64-bit linear feedback shift register with taps 64, 63, 61 and 60
//! (feedback polynomial `x^64 + x^63 + x^61 + x^60 + 1`). The register is reseeded from the
//! physical address of every page that is written or verified, which means the expected
//! contents of any page can be regenerated at any time without keeping reference data around.

#![cfg_attr(not(test), no_std)]

/// Number of bytes covered by one reseed of the generator.
pub const PAGE_SIZE: usize = 4096;
/// Number of 64-bit words in a page, i.e. the number of [`Lfsr::next_word`] calls per reseed.
pub const WORDS_PER_PAGE: usize = PAGE_SIZE / size_of::<u64>();

/// Mask applied to the seed. Breaks up the structure of page addresses (which are mostly zero
/// bits) and makes sure that at least one bit of the register is set.
const SEED_MASK: u64 = 0x7DEF_56A1_8BC1_A1E5;
/// Number of steps discarded after reseeding.
const MIX_ROUNDS: usize = 50;

/// Linear feedback shift register producing the test pattern.
///
/// The all-zero state is a fixed point of the register. [`Lfsr::from_seed`] only reaches it for
/// the single seed equal to the internal seed mask, which is not page aligned and therefore never
/// used as a page address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lfsr {
    state: u64,
}

impl Lfsr {
    /// Creates a generator that is already reseeded with `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        let mut lfsr = Self { state: 0 };
        lfsr.reseed(seed);
        lfsr
    }

    /// Reinitializes the register from `seed`.
    ///
    /// The seed is masked, then the register is stepped a number of times to remove short-range
    /// correlation between neighbouring seeds. The value of one final step becomes the new state,
    /// so the first word returned afterward is already one step away from the mixed seed.
    pub fn reseed(&mut self, seed: u64) {
        self.state = seed ^ SEED_MASK;

        for _ in 0..MIX_ROUNDS {
            self.next_word();
        }

        self.state = self.next_word();
    }

    /// Advances the register by one step and returns the new state.
    #[inline]
    pub fn next_word(&mut self) -> u64 {
        let r = self.state;
        let bit = (r ^ (r >> 1) ^ (r >> 3) ^ (r >> 4)) & 1;

        self.state = (r >> 1) | (bit << 63);
        self.state
    }

    /// Reseeds the generator with `seed` and fills `page` with the words that follow.
    ///
    /// This is exactly the sequence that is written to (and expected in) the page whose physical
    /// address is `seed`.
    pub fn fill_page(&mut self, seed: u64, page: &mut [u64; WORDS_PER_PAGE]) {
        self.reseed(seed);

        for word in page.iter_mut() {
            *word = self.next_word();
        }
    }

    /// Returns the current register value without advancing it.
    #[must_use]
    pub const fn state(&self) -> u64 {
        self.state
    }
}

impl Iterator for Lfsr {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_word())
    }
}
