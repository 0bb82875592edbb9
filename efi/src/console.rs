// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt::Write;

use remanence::{Console, Error, Operation, Progress};
use uefi::boot;
use uefi::proto::console::text::Key;
use uefi::system::{with_stdin, with_stdout};

macro_rules! println {
    () => {
        $crate::console::print(format_args!("\n"))
    };
    ($($arg:tt)*) => {
        $crate::console::print(format_args!("{}\n", format_args!($($arg)*)))
    };
}
pub(crate) use println;

pub fn print(args: core::fmt::Arguments) {
    with_stdout(|out| {
        // nowhere to report a broken console to
        let _ = out.write_fmt(args);
    });
}

/// Clears the screen.
///
/// # Errors
///
/// Returns an error if the firmware fails to reset the console.
pub fn clear() -> uefi::Result {
    with_stdout(|out| out.clear())
}

/// The firmware text input device.
pub struct UefiConsole;

impl Console for UefiConsole {
    fn read_key(&mut self) -> remanence::Result<char> {
        let failed = |err: uefi::Error| Error::platform(Operation::ReadKey, err);

        loop {
            let event = with_stdin(|stdin| stdin.wait_for_key_event())
                .ok_or_else(|| Error::platform(Operation::ReadKey, "no key event"))?;
            boot::wait_for_event(&mut [event])
                .map_err(|err| Error::platform(Operation::ReadKey, err.status()))?;

            if let Some(Key::Printable(c)) = with_stdin(|stdin| stdin.read_key()).map_err(failed)? {
                return Ok(char::from(c));
            }
        }
    }
}

/// Prints the progress of a pass as `... NNN%` on a single line.
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn report(&mut self, percent: u64) {
        print(format_args!("\r... {percent:3}%"));
    }
}
