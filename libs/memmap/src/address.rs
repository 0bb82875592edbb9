// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

/// A physical memory address.
///
/// Physical addresses are always 64 bits wide, independent of the pointer width of the machine
/// we are running on.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    pub const MAX: Self = Self(u64::MAX);
    pub const MIN: Self = Self(u64::MIN);
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Adds an unsigned offset to this address, panicking if overflow occurred.
    #[must_use]
    #[inline]
    pub const fn add(self, offset: u64) -> Self {
        Self(self.0 + offset)
    }

    /// Subtracts an unsigned offset from this address, panicking if overflow occurred.
    #[must_use]
    #[inline]
    pub const fn sub(self, offset: u64) -> Self {
        Self(self.0 - offset)
    }

    /// Adds an unsigned offset to this address, returning `None` if overflow occurred.
    #[must_use]
    #[inline]
    pub const fn checked_add(self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Calculates the distance between two addresses in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `origin` is greater than `self`.
    #[must_use]
    #[inline]
    pub const fn offset_from_unsigned(self, origin: Self) -> u64 {
        assert!(origin.0 <= self.0, "origin must not be greater than self");
        self.0 - origin.0
    }

    /// Rounds the address up to the next multiple of `align`, which must be a power of two.
    #[must_use]
    #[inline]
    pub const fn align_up(self, align: u64) -> Self {
        debug_assert!(align.is_power_of_two());
        Self((self.0 + (align - 1)) & !(align - 1))
    }

    /// Like [`Self::align_up`] but returns `None` instead of overflowing.
    #[must_use]
    #[inline]
    pub const fn checked_align_up(self, align: u64) -> Option<Self> {
        debug_assert!(align.is_power_of_two());
        match self.0.checked_add(align - 1) {
            Some(n) => Some(Self(n & !(align - 1))),
            None => None,
        }
    }

    /// Rounds the address down to the previous multiple of `align`, which must be a power of two.
    #[must_use]
    #[inline]
    pub const fn align_down(self, align: u64) -> Self {
        debug_assert!(align.is_power_of_two());
        Self(self.0 & !(align - 1))
    }

    #[must_use]
    #[inline]
    pub const fn is_aligned_to(self, align: u64) -> bool {
        self.0 & (align - 1) == 0
    }
}

impl From<u64> for PhysicalAddress {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<PhysicalAddress> for u64 {
    fn from(value: PhysicalAddress) -> Self {
        value.0
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PhysicalAddress")
            .field(&format_args!("{:#x}", self.0))
            .finish()
    }
}

impl fmt::LowerHex for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
