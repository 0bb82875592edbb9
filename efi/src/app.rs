// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use alloc::string::String;
use core::convert::Infallible;

use memmap::Policy;
use remanence::{Action, Mode, PhysicalAddress, RegionMap, handoff, inventory, pass};
use uefi::proto::loaded_image::LoadedImage;
use uefi::runtime::ResetType;
use uefi::{Status, boot, runtime};

use crate::bootargs::Bootargs;
use crate::console::{self, ConsoleProgress, UefiConsole, println};
use crate::error::Error;
use crate::platform::{FirmwareInventory, IdentityMapped, ResultsFile, VariableStore};
use crate::{arch, metadata};

/// Disables the watchdog, runs one phase of the test and resets the machine.
///
/// Only returns if something went wrong.
///
/// # Errors
///
/// Returns an error if a firmware service or the phase itself fails.
pub fn run() -> Result<Infallible, Error> {
    let args = bootargs()?;
    log::set_max_level(args.log);
    log::debug!("{args:?}");

    console::clear()?;
    boot::set_watchdog_timer(0, 0x10000, None)?;

    println!("Application for testing RAM data decay");

    let policy = Policy::new(load_address());
    let map = inventory::tested_memory(&mut FirmwareInventory, &policy)?;

    let mode = match args.mode {
        Some(mode) => mode,
        None => {
            println!("{}", Mode::MENU);
            Mode::prompt(&mut UefiConsole)?
        }
    };
    println!("{mode} was selected");

    run_mode(mode, &map, &args)?;
    println!("\n{mode} done");

    arch::flush_caches();

    if !inventory::check_drift(&mut FirmwareInventory, &policy, &map)? {
        log::warn!("the memory map changed while testing, the results of this boot are unreliable");
    }

    let action = match args.after {
        Some(action) => action,
        None => {
            println!("Press r to reboot, s to shut down");
            Action::prompt(&mut UefiConsole)?
        }
    };

    let reset = match action {
        Action::Reboot => ResetType::WARM,
        Action::Shutdown => ResetType::SHUTDOWN,
    };
    runtime::reset(reset, Status::SUCCESS, None)
}

fn run_mode(mode: Mode, map: &RegionMap, args: &Bootargs) -> Result<(), Error> {
    let mut memory = IdentityMapped;
    let mut store = VariableStore;

    match mode {
        Mode::Write => pass::write(map, &mut memory, &mut ConsoleProgress),
        Mode::Exclude => {
            let mut tested = map.clone();
            let summary = pass::probe(&mut tested, &memory, &mut ConsoleProgress)?;
            println!();
            log::info!(
                "excluded {} pages in {} runs, {} regions remain",
                summary.pages,
                summary.runs,
                tested.len()
            );

            handoff::persist(&mut store, &tested)?;
        }
        Mode::Compare => {
            let stats = pass::compare_stored(&mut store, &memory, &mut ConsoleProgress)?;
            println!();
            println!("{stats}");
            println!("{}", stats.table());

            let time = metadata::now();
            let path = args
                .results
                .clone()
                .unwrap_or_else(|| metadata::default_results_path(time.as_ref()));
            let mut results = ResultsFile::new(path);
            stats.emit(&mut results, &metadata::collect(time.as_ref()))?;
        }
    }

    Ok(())
}

fn bootargs() -> Result<Bootargs, Error> {
    let image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())?;
    let options = image
        .load_options_as_cstr16()
        .map(String::from)
        .unwrap_or_default();

    Bootargs::from_load_options(&options).map_err(Error::Bootargs)
}

fn load_address() -> PhysicalAddress {
    PhysicalAddress::new(run as usize as u64)
}
