// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;
use core::str::FromStr;

use crate::Console;

/// The phase of the test to run in this boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fill memory with the pattern.
    Write,
    /// Exclude the ranges the firmware overwrote since the pattern was written.
    Exclude,
    /// Count the bits that no longer match the pattern.
    Compare,
}

impl Mode {
    pub const MENU: &'static str = "Choose the mode:\n\
        1. Pattern write\n\
        2. Exclude modified by firmware\n\
        3. Pattern compare\n";

    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            '1' => Some(Mode::Write),
            '2' => Some(Mode::Exclude),
            '3' => Some(Mode::Compare),
            _ => None,
        }
    }

    /// Waits for one of the menu keys, ignoring all others.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the console fails.
    pub fn prompt(console: &mut impl Console) -> crate::Result<Self> {
        loop {
            let key = console.read_key()?;
            if let Some(mode) = Self::from_key(key) {
                return Ok(mode);
            }
            log::trace!("ignoring key {key:?}");
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Write => "Pattern write",
            Mode::Exclude => "Exclude modified by firmware",
            Mode::Compare => "Pattern compare",
        })
    }
}

impl FromStr for Mode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "write" | "1" => Ok(Mode::Write),
            "exclude" | "2" => Ok(Mode::Exclude),
            "compare" | "3" => Ok(Mode::Compare),
            _ => Err(UnknownVariant),
        }
    }
}

/// What to do once a pass completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Warm reboot, keeping DRAM powered.
    Reboot,
    Shutdown,
}

impl Action {
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'r' => Some(Action::Reboot),
            's' => Some(Action::Shutdown),
            _ => None,
        }
    }

    /// Waits for `r` or `s`, ignoring all other keys.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the console fails.
    pub fn prompt(console: &mut impl Console) -> crate::Result<Self> {
        loop {
            if let Some(action) = Self::from_key(console.read_key()?) {
                return Ok(action);
            }
        }
    }
}

impl FromStr for Action {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reboot" => Ok(Action::Reboot),
            "shutdown" => Ok(Action::Shutdown),
            _ => Err(UnknownVariant),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownVariant;

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown variant")
    }
}

impl core::error::Error for UnknownVariant {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::test_utils::ScriptedConsole;

    #[test]
    fn prompt_skips_unrelated_keys() {
        let mut keys = ScriptedConsole::new("x0421");
        assert_eq!(Mode::prompt(&mut keys), Ok(Mode::Exclude));
        assert_eq!(keys.read_key(), Ok('1'));

        let mut keys = ScriptedConsole::new("\nqS");
        assert_eq!(Action::prompt(&mut keys), Ok(Action::Shutdown));
    }

    #[test]
    fn prompt_fails_when_input_runs_out() {
        let mut keys = ScriptedConsole::new("9x");
        assert!(matches!(
            Mode::prompt(&mut keys),
            Err(Error::Platform { .. })
        ));
    }

    #[test]
    fn parse() {
        assert_eq!("compare".parse(), Ok(Mode::Compare));
        assert_eq!("2".parse(), Ok(Mode::Exclude));
        assert_eq!("Write".parse::<Mode>(), Err(UnknownVariant));
        assert_eq!("reboot".parse(), Ok(Action::Reboot));
        assert_eq!("halt".parse::<Action>(), Err(UnknownVariant));
    }
}
