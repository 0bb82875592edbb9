// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Labels for the result file, gathered from SMBIOS and the real time clock.

use alloc::format;
use alloc::string::{String, ToString};
use core::slice;

use remanence::Metadata;
use remanence::report::{DATE, DIMM, MANUFACTURER, PRODUCT_NAME, TEMPERATURE, TIME};
use smbios::EntryPoint;
use uefi::runtime::{self, Time};
use uefi::table::cfg::ConfigTableEntry;
use uefi::{Guid, guid, system};

const SMBIOS: Guid = guid!("eb9d2d31-2d88-11d3-9a16-0090273fc14d");
const SMBIOS3: Guid = guid!("f2fd1544-9794-4a2c-992e-e5bbcf20e394");

/// Collects the metadata rows of the result file.
///
/// Missing or malformed information leaves the corresponding rows empty.
pub fn collect(time: Option<&Time>) -> Metadata {
    let mut metadata = Metadata::new();
    let table = smbios_table();

    let system = table.and_then(smbios::system_info).unwrap_or_default();
    metadata.push(PRODUCT_NAME, [system.product_name.unwrap_or_default()]);
    metadata.push(MANUFACTURER, [system.manufacturer.unwrap_or_default()]);
    let date = time.map(|t| {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second()
        )
    });
    metadata.push(DATE, [date.unwrap_or_default()]);
    metadata.push(TEMPERATURE, [""]);
    metadata.push(TIME, [""]);

    for device in table.into_iter().flat_map(smbios::memory_devices) {
        metadata.push(
            DIMM,
            [
                device.locator.unwrap_or_default().to_string(),
                device.bank_locator.unwrap_or_default().to_string(),
                device.manufacturer.unwrap_or_default().to_string(),
                device.part_number.unwrap_or_default().to_string(),
                device.serial_number.unwrap_or_default().to_string(),
                device.size_mib.map(|s| s.to_string()).unwrap_or_default(),
                device.speed_mts.map(|s| s.to_string()).unwrap_or_default(),
            ],
        );
    }

    metadata
}

/// The current time, if the real time clock can be read.
pub fn now() -> Option<Time> {
    runtime::get_time()
        .inspect_err(|err| log::warn!("failed to read the real time clock: {err}"))
        .ok()
}

/// Default result file path on the boot volume, named after the time of the measurement.
pub fn default_results_path(time: Option<&Time>) -> String {
    match time {
        Some(t) => format!(
            "\\decay-{:04}{:02}{:02}-{:02}{:02}{:02}.csv",
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second()
        ),
        None => String::from("\\decay.csv"),
    }
}

fn smbios_table() -> Option<&'static [u8]> {
    let addr = system::with_config_table(|entries| {
        find(entries, SMBIOS3).or_else(|| find(entries, SMBIOS))
    })?;

    let ep = entry_point(addr)
        .inspect_err(|err| log::warn!("ignoring SMBIOS tables: {err}"))
        .ok()?;
    log::debug!("SMBIOS {}.{} {ep:x?}", ep.major, ep.minor);

    let table_address = usize::try_from(ep.table_address).ok()?;
    let table_len = usize::try_from(ep.table_len).ok()?;
    // Safety: the entry point was validated, so the table it points to is provided by the firmware
    // and mapped like the entry point itself
    Some(unsafe {
        slice::from_raw_parts(
            core::ptr::with_exposed_provenance::<u8>(table_address),
            table_len,
        )
    })
}

fn entry_point(addr: *const u8) -> smbios::Result<EntryPoint> {
    // Safety: the firmware guarantees the entry point referenced by its configuration table to be
    // mapped, and it stays in place as long as boot services are active. Both entry point versions
    // are longer than their header.
    let header = unsafe { slice::from_raw_parts(addr, EntryPoint::HEADER_LEN) };
    let len = EntryPoint::declared_len(header)?;
    // Safety: as above, the firmware provides as many bytes as the entry point declares
    EntryPoint::parse(unsafe { slice::from_raw_parts(addr, len) })
}

fn find(entries: &[ConfigTableEntry], guid: Guid) -> Option<*const u8> {
    entries
        .iter()
        .find(|entry| entry.guid == guid)
        .map(|entry| entry.address.cast::<u8>())
}
