// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use crate::report::Metadata;
use crate::{ResultSink, WORD_BITS};

/// Per-bit flip counters collected by [`crate::pass::compare`].
///
/// Bit `i` refers to bit `i` of a 64-bit memory word, i.e. to a fixed line of the data bus.
#[derive(Clone, PartialEq, Eq)]
pub struct BitStatistics {
    zero_to_one: [u64; WORD_BITS],
    one_to_zero: [u64; WORD_BITS],
    compared_bits: u64,
    differing_bits: u64,
}

impl Default for BitStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl BitStatistics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            zero_to_one: [0; WORD_BITS],
            one_to_zero: [0; WORD_BITS],
            compared_bits: 0,
            differing_bits: 0,
        }
    }

    /// Accounts for one compared word.
    #[inline]
    pub fn record(&mut self, expected: u64, actual: u64) {
        self.compared_bits += u64::from(u64::BITS);

        let mut diff = expected ^ actual;
        while diff != 0 {
            let bit = diff.trailing_zeros() as usize;
            if actual & (1 << bit) != 0 {
                self.zero_to_one[bit] += 1;
            } else {
                self.one_to_zero[bit] += 1;
            }
            diff &= diff - 1;
        }
    }

    /// Computes [`Self::differing_bits`] from the per-bit counters. Called once all words have
    /// been recorded.
    pub fn finish(&mut self) {
        self.differing_bits = self
            .zero_to_one
            .iter()
            .chain(self.one_to_zero.iter())
            .sum();
    }

    /// Number of bits that read back as 1 although 0 was written.
    #[must_use]
    pub fn zero_to_one(&self) -> &[u64; WORD_BITS] {
        &self.zero_to_one
    }

    /// Number of bits that read back as 0 although 1 was written.
    #[must_use]
    pub fn one_to_zero(&self) -> &[u64; WORD_BITS] {
        &self.one_to_zero
    }

    #[must_use]
    pub fn differing_bits(&self) -> u64 {
        self.differing_bits
    }

    #[must_use]
    pub fn compared_bits(&self) -> u64 {
        self.compared_bits
    }

    /// Share of differing bits in parts per million.
    #[must_use]
    pub fn differing_ppm(&self) -> u64 {
        if self.compared_bits == 0 {
            return 0;
        }
        let ppm = u128::from(self.differing_bits) * 1_000_000 / u128::from(self.compared_bits);
        u64::try_from(ppm).unwrap_or(u64::MAX)
    }

    /// Writes the counters to `sink`, one record per bit followed by the summary.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by `sink`.
    pub fn emit(&self, sink: &mut impl ResultSink, metadata: &Metadata) -> crate::Result<()> {
        for bit in 0..u64::BITS {
            let i = bit as usize;
            sink.append_record(bit, self.zero_to_one[i], self.one_to_zero[i])?;
        }
        sink.finalize(self.differing_bits, self.compared_bits, metadata)
    }

    /// Human readable per-bit table, as printed after a comparison.
    #[must_use]
    pub fn table(&self) -> Table<'_> {
        Table(self)
    }
}

impl fmt::Debug for BitStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitStatistics")
            .field("differing_bits", &self.differing_bits)
            .field("compared_bits", &self.compared_bits)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for BitStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ppm = self.differing_ppm();
        write!(
            f,
            "{}/{} different bits ({}.{:04}%)",
            self.differing_bits,
            self.compared_bits,
            ppm / 10_000,
            ppm % 10_000
        )
    }
}

/// See [`BitStatistics::table`].
pub struct Table<'a>(&'a BitStatistics);

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, (zero_to_one, one_to_zero)) in self
            .0
            .zero_to_one
            .iter()
            .zip(self.0.one_to_zero.iter())
            .enumerate()
        {
            writeln!(
                f,
                "{bit:2}: {zero_to_one:16} 0to1, {one_to_zero:16} 1to0, {:16} total",
                zero_to_one + one_to_zero
            )?;
        }
        Ok(())
    }
}
