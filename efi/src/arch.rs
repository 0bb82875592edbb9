// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        use core::arch::asm;

        /// Writes back and invalidates all CPU caches so the pattern is held by DRAM alone.
        pub fn flush_caches() {
            // Safety: `wbinvd` only affects caches and we run at CPL 0 under UEFI
            unsafe { asm!("wbinvd", options(nostack, preserves_flags)) };
        }

        pub fn halt() -> ! {
            loop {
                // Safety: nothing left to do, masking interrupts keeps us parked
                unsafe { asm!("cli", "hlt", options(nomem, nostack)) };
            }
        }
    } else {
        pub fn flush_caches() {
            log::warn!("flushing caches is not supported on this architecture");
        }

        pub fn halt() -> ! {
            loop {
                core::hint::spin_loop();
            }
        }
    }
}
