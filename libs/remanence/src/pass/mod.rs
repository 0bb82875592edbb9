// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The three passes over the tested memory.
//!
//! All passes walk the map in order, the pages of every entry in ascending address order and the
//! words of every page in ascending order. Every page is filled with, or checked against, the
//! output of an [`Lfsr`](lfsr::Lfsr) seeded with the page's physical address, so no reference
//! copy of the pattern has to be kept anywhere.

mod compare;
mod probe;
mod write;

pub use compare::{compare, compare_stored};
pub use probe::{ProbeSummary, probe};
pub use write::write;

use crate::Progress;

/// Turns the number of processed pages into percent and forwards changes to a [`Progress`].
pub(crate) struct Tracker<'a, P> {
    sink: &'a mut P,
    total_pages: u64,
    pages_done: u64,
    last: Option<u64>,
}

impl<'a, P: Progress> Tracker<'a, P> {
    pub(crate) fn new(sink: &'a mut P, total_pages: u64) -> Self {
        Self {
            sink,
            total_pages,
            pages_done: 0,
            last: None,
        }
    }

    pub(crate) fn page_done(&mut self) {
        self.pages_done += 1;

        let percent = if self.total_pages == 0 {
            100
        } else {
            self.pages_done * 100 / self.total_pages
        };

        if self.last != Some(percent) {
            self.last = Some(percent);
            self.sink.report(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn reports_changes_only() {
        let mut seen = Vec::new();
        let mut sink = |p: u64| seen.push(p);
        let mut tracker = Tracker::new(&mut sink, 300);
        for _ in 0..300 {
            tracker.page_done();
        }

        assert_eq!(seen, (0..=100).collect::<Vec<_>>());
    }
}
