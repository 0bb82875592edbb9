// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use smbios::{Error, MemoryDevice, Structures, SystemInfo};

/// Appends a structure with the given formatted area (header excluded) and strings.
fn structure(table: &mut Vec<u8>, kind: u8, handle: u16, body: &[u8], strings: &[&str]) {
    table.push(kind);
    table.push(u8::try_from(body.len() + 4).unwrap());
    table.extend_from_slice(&handle.to_le_bytes());
    table.extend_from_slice(body);

    if strings.is_empty() {
        table.extend_from_slice(&[0, 0]);
    } else {
        for s in strings {
            table.extend_from_slice(s.as_bytes());
            table.push(0);
        }
        table.push(0);
    }
}

fn system_information() -> Vec<u8> {
    // manufacturer, product, version, serial
    let mut body = vec![1, 2, 0, 3];
    body.resize(0x1b - 4, 0);
    body
}

/// Builds a type 17 formatted area of SMBIOS 3.3 length.
fn memory_device(size: u16, extended_size: u32, speed: u16, configured_speed: u16) -> Vec<u8> {
    let mut body = vec![0u8; 0x5c - 4];
    let mut put = |offset: usize, bytes: &[u8]| {
        body[offset - 4..offset - 4 + bytes.len()].copy_from_slice(bytes);
    };

    put(0x0c, &size.to_le_bytes());
    put(0x10, &[1]); // locator
    put(0x11, &[2]); // bank locator
    put(0x15, &speed.to_le_bytes());
    put(0x17, &[3]); // manufacturer
    put(0x18, &[4]); // serial
    put(0x1a, &[5]); // part number
    put(0x1c, &extended_size.to_le_bytes());
    put(0x20, &configured_speed.to_le_bytes());
    body
}

const DIMM_STRINGS: &[&str] = &["DIMM 0", "BANK 0", "Samsung", "0x1234ABCD", "M378A1K43CB2-CTD "];

fn table() -> Vec<u8> {
    let mut table = Vec::new();
    structure(&mut table, 0, 0, &[1, 2, 0xf0, 0], &["Vendor", "1.0"]);
    structure(
        &mut table,
        1,
        1,
        &system_information(),
        &["LENOVO", "20HRCTO1WW", "S/N 42"],
    );
    structure(&mut table, 17, 2, &memory_device(8192, 0, 2666, 2400), DIMM_STRINGS);
    // empty slot
    structure(&mut table, 17, 3, &memory_device(0, 0, 0, 0), &[]);
    // 32 GiB module using the extended size field
    structure(
        &mut table,
        17,
        4,
        &memory_device(0x7fff, 32768, 3200, 0),
        DIMM_STRINGS,
    );
    structure(&mut table, 127, 5, &[], &[]);
    table
}

#[test_log::test]
fn iterates_until_end_of_table() {
    let mut table = table();
    // trailing garbage after the end-of-table structure must be ignored
    table.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0x00]);

    let kinds: Vec<_> = Structures::new(&table)
        .map(|s| s.map(|s| (s.kind(), s.handle())))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(kinds, [(0, 0), (1, 1), (17, 2), (17, 3), (17, 4), (127, 5)]);
}

#[test_log::test]
fn system_info() {
    let table = table();

    assert_eq!(
        smbios::system_info(&table),
        Some(SystemInfo {
            manufacturer: Some("LENOVO"),
            product_name: Some("20HRCTO1WW"),
            version: None,
            serial_number: Some("S/N 42"),
        })
    );
}

#[test_log::test]
fn memory_devices_skip_empty_slots() {
    let table = table();
    let devices: Vec<_> = smbios::memory_devices(&table).collect();

    assert_eq!(devices.len(), 2);
    assert_eq!(
        devices[0],
        MemoryDevice {
            locator: Some("DIMM 0"),
            bank_locator: Some("BANK 0"),
            manufacturer: Some("Samsung"),
            serial_number: Some("0x1234ABCD"),
            part_number: Some("M378A1K43CB2-CTD"),
            size_mib: Some(8192),
            speed_mts: Some(2400),
        }
    );

    // extended size, and no configured speed so the rated speed is used
    assert_eq!(devices[1].size_mib, Some(32768));
    assert_eq!(devices[1].speed_mts, Some(3200));
}

#[test]
fn size_in_kib() {
    let mut table = Vec::new();
    structure(&mut table, 17, 0, &memory_device(0x8000 | 2048, 0, 0, 0), &[]);

    let device = smbios::memory_devices(&table).next().unwrap();
    assert_eq!(device.size_mib, Some(2));
    assert_eq!(device.speed_mts, None);
    assert_eq!(device.locator, None);
}

#[test]
fn short_legacy_structures() {
    // an SMBIOS 2.1 memory device has no extended fields at all
    let mut body = memory_device(4096, 0, 1600, 0);
    body.truncate(0x15 - 4);

    let mut table = Vec::new();
    structure(&mut table, 17, 0, &body, DIMM_STRINGS);

    let device = smbios::memory_devices(&table).next().unwrap();
    assert_eq!(device.size_mib, Some(4096));
    assert_eq!(device.speed_mts, None);
    assert_eq!(device.bank_locator, Some("BANK 0"));
    assert_eq!(device.manufacturer, None);
}

#[test]
fn malformed_tables() {
    let mut table = Vec::new();
    structure(&mut table, 1, 0, &system_information(), &["A"]);
    let valid_len = table.len();

    // header claims a formatted area shorter than the header itself
    table.extend_from_slice(&[17, 2, 0, 0]);
    let res: Vec<_> = Structures::new(&table).collect();
    assert_eq!(res.len(), 2);
    assert!(res[0].is_ok());
    assert_eq!(
        res[1].as_ref().unwrap_err(),
        &Error::BadStructureLength {
            offset: valid_len,
            length: 2
        }
    );

    // string set without terminator
    table.truncate(valid_len);
    table.extend_from_slice(&[17, 4, 0, 0, b'x']);
    let res: Vec<_> = Structures::new(&table).collect();
    assert_eq!(
        res.last().unwrap().as_ref().unwrap_err(),
        &Error::Truncated { offset: valid_len }
    );

    // a broken table still yields what came before it
    assert!(smbios::system_info(&table).is_some());
}
