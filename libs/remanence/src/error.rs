// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use alloc::string::{String, ToString};
use core::fmt::{Display, Formatter};

use crate::handoff::HandoffError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A region map operation violated one of its preconditions.
    Map(memmap::Error),
    /// The persisted region map is missing or corrupt.
    Handoff(HandoffError),
    /// A platform service failed.
    Platform { operation: Operation, reason: String },
}

/// Platform operations the tester depends on, used to label [`Error::Platform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    QueryInventory,
    PersistMap,
    ReadMap,
    EraseMap,
    ReadKey,
    WriteResults,
}

impl Error {
    #[must_use]
    pub fn platform(operation: Operation, reason: impl Display) -> Self {
        Error::Platform {
            operation,
            reason: reason.to_string(),
        }
    }
}

impl From<memmap::Error> for Error {
    fn from(err: memmap::Error) -> Self {
        Error::Map(err)
    }
}

impl From<HandoffError> for Error {
    fn from(err: HandoffError) -> Self {
        Error::Handoff(err)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Operation::QueryInventory => "query the memory inventory",
            Operation::PersistMap => "persist the tested memory map",
            Operation::ReadMap => "read the tested memory map",
            Operation::EraseMap => "erase the tested memory map",
            Operation::ReadKey => "read a key",
            Operation::WriteResults => "write the results",
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Map(err) => write!(f, "{err}"),
            Error::Handoff(err) => write!(f, "tested memory map unusable: {err}"),
            Error::Platform { operation, reason } => {
                write!(f, "failed to {operation}: {reason}")
            }
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Map(err) => Some(err),
            Error::Handoff(err) => Some(err),
            Error::Platform { .. } => None,
        }
    }
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error:expr, $($msg:tt)+) => {
        if !$cond {
            log::error!($($msg)+);
            return Err($error.into());
        }
    };
    ($cond:expr, $error:expr) => {
        if !$cond {
            return Err($error.into());
        }
    };
}

#[macro_export]
macro_rules! bail {
    ($error:expr, $($msg:tt)+) => {{
        log::error!($($msg)+);
        return Err($error.into());
    }};
    ($error:expr) => {
        return Err($error.into());
    };
}
