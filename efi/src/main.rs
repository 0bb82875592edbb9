// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! UEFI application measuring how long DRAM retains its contents without power.

#![cfg_attr(target_os = "uefi", no_std, no_main)]

extern crate alloc;

#[cfg_attr(
    all(not(target_os = "uefi"), not(test)),
    expect(dead_code, reason = "only the UEFI build reads load options")
)]
mod bootargs;

cfg_if::cfg_if! {
    if #[cfg(target_os = "uefi")] {
        mod app;
        mod arch;
        mod console;
        mod error;
        mod logger;
        mod metadata;
        mod panic;
        mod platform;

        use uefi::{Status, entry};

        #[entry]
        fn main() -> Status {
            logger::init(log::LevelFilter::Info);

            let Err(err) = app::run();
            log::error!("{err}");
            arch::halt()
        }
    } else {
        fn main() {
            eprintln!("decay-efi only runs as a UEFI application, build it for a `*-unknown-uefi` target");
        }
    }
}
