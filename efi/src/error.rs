// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum Error {
    /// A firmware service failed.
    Uefi(uefi::Error),
    /// A pass, the handoff, or the bookkeeping of the tested memory failed.
    Remanence(remanence::Error),
    /// The load options of the image are malformed.
    Bootargs(anyhow::Error),
}

impl From<uefi::Error> for Error {
    fn from(err: uefi::Error) -> Self {
        Self::Uefi(err)
    }
}

impl From<remanence::Error> for Error {
    fn from(err: remanence::Error) -> Self {
        Self::Remanence(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Uefi(err) => write!(f, "UEFI call failed: {err}"),
            Error::Remanence(err) => write!(f, "{err}"),
            Error::Bootargs(err) => write!(f, "invalid load options: {err:#}"),
        }
    }
}

impl core::error::Error for Error {}
