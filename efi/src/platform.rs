// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The tester's platform services on top of UEFI boot and runtime services.

use alloc::string::String;
use alloc::vec::Vec;
use core::ptr;

use memmap::{PhysicalAddress, RawRegion, RegionKind};
use remanence::platform::Page;
use remanence::report::CsvWriter;
use remanence::{
    BlobStore, Error, MemoryInventory, Metadata, Operation, PhysicalMemory, ResultSink,
};
use uefi::fs::{FileSystem, PathBuf};
use uefi::mem::memory_map::{MemoryDescriptor, MemoryMap, MemoryType};
use uefi::runtime::{VariableAttributes, VariableVendor};
use uefi::{CString16, Status, boot, guid, runtime};

/// Vendor GUID of the variable holding the tested memory map.
const VENDOR: VariableVendor = VariableVendor(guid!("865a4a83-19e9-4f5b-8406-bca0db86915e"));

fn to_cstr16(s: &str, operation: Operation) -> remanence::Result<CString16> {
    CString16::try_from(s).map_err(|_| Error::platform(operation, "name is not UCS-2"))
}

/// The boot services memory map.
pub struct FirmwareInventory;

impl MemoryInventory for FirmwareInventory {
    fn raw_regions(&mut self) -> remanence::Result<Vec<RawRegion>> {
        let failed = |reason| Error::platform(Operation::QueryInventory, reason);

        let map = boot::memory_map(MemoryType::LOADER_DATA).map_err(|err| failed(err.status()))?;
        let meta = map.meta();
        if meta.desc_version != MemoryDescriptor::VERSION
            || meta.desc_size < size_of::<MemoryDescriptor>()
        {
            log::error!(
                "memory descriptor version {} size {}, expected version {} size {}",
                meta.desc_version,
                meta.desc_size,
                MemoryDescriptor::VERSION,
                size_of::<MemoryDescriptor>()
            );
            return Err(failed(Status::INCOMPATIBLE_VERSION));
        }

        Ok(map
            .entries()
            .map(|desc| RawRegion {
                kind: if desc.ty == MemoryType::CONVENTIONAL {
                    RegionKind::Conventional
                } else {
                    RegionKind::Other(desc.ty.0)
                },
                start: PhysicalAddress::new(desc.phys_start),
                page_count: desc.page_count,
            })
            .collect())
    }
}

/// Non-volatile UEFI variables.
pub struct VariableStore;

impl BlobStore for VariableStore {
    fn persist(&mut self, key: &str, data: &[u8]) -> remanence::Result<()> {
        let name = to_cstr16(key, Operation::PersistMap)?;
        let attributes = VariableAttributes::NON_VOLATILE
            | VariableAttributes::BOOTSERVICE_ACCESS
            | VariableAttributes::RUNTIME_ACCESS;

        runtime::set_variable(&name, &VENDOR, attributes, data)
            .map_err(|err| Error::platform(Operation::PersistMap, err.status()))
    }

    fn read(&mut self, key: &str) -> remanence::Result<Option<Vec<u8>>> {
        let name = to_cstr16(key, Operation::ReadMap)?;

        match runtime::get_variable_boxed(&name, &VENDOR) {
            Ok((data, _)) => Ok(Some(data.into_vec())),
            Err(err) if err.status() == Status::NOT_FOUND => Ok(None),
            Err(err) => Err(Error::platform(Operation::ReadMap, err.status())),
        }
    }

    fn erase(&mut self, key: &str) -> remanence::Result<()> {
        let name = to_cstr16(key, Operation::EraseMap)?;

        match runtime::delete_variable(&name, &VENDOR) {
            Err(err) if err.status() != Status::NOT_FOUND => {
                Err(Error::platform(Operation::EraseMap, err.status()))
            }
            _ => Ok(()),
        }
    }
}

/// Physical memory, identity mapped by the firmware while boot services are active.
pub struct IdentityMapped;

impl IdentityMapped {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the UEFI targets we build for are all 64-bit"
    )]
    fn word_ptr(page: PhysicalAddress) -> *mut u64 {
        ptr::with_exposed_provenance_mut(page.get() as usize)
    }
}

impl PhysicalMemory for IdentityMapped {
    fn read_page(&self, page: PhysicalAddress, buf: &mut Page) {
        let base = Self::word_ptr(page);
        for (i, word) in buf.iter_mut().enumerate() {
            // Safety: boot services identity map all memory, and the map only holds page aligned
            // conventional memory which nothing else uses while we run
            *word = unsafe { base.add(i).read_volatile() };
        }
    }

    fn write_page(&mut self, page: PhysicalAddress, buf: &Page) {
        let base = Self::word_ptr(page);
        for (i, word) in buf.iter().enumerate() {
            // Safety: see `read_page`
            unsafe { base.add(i).write_volatile(*word) };
        }
    }
}

/// The CSV result file on the volume the image was loaded from.
pub struct ResultsFile {
    path: String,
    csv: CsvWriter<String>,
}

impl ResultsFile {
    pub fn new(path: String) -> Self {
        Self {
            path,
            csv: CsvWriter::new(String::new()),
        }
    }
}

impl ResultSink for ResultsFile {
    fn append_record(
        &mut self,
        bit: u32,
        zero_to_one: u64,
        one_to_zero: u64,
    ) -> remanence::Result<()> {
        self.csv.append_record(bit, zero_to_one, one_to_zero)
    }

    fn finalize(
        &mut self,
        differing_bits: u64,
        compared_bits: u64,
        metadata: &Metadata,
    ) -> remanence::Result<()> {
        let failed = |reason| Error::platform(Operation::WriteResults, reason);

        self.csv.finalize(differing_bits, compared_bits, metadata)?;
        let contents = core::mem::replace(&mut self.csv, CsvWriter::new(String::new()));

        let path = PathBuf::from(to_cstr16(&self.path, Operation::WriteResults)?);
        let sfs = boot::get_image_file_system(boot::image_handle())
            .map_err(|err| failed(alloc::format!("{}", err.status())))?;
        FileSystem::new(sfs)
            .write(&path, contents.into_inner())
            .map_err(|err| failed(alloc::format!("{err}")))?;

        log::info!("results written to {}", self.path);
        Ok(())
    }
}
