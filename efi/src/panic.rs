// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::arch;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    let msg = info.message();

    if let Some(loc) = info.location() {
        log::error!("panicked at {loc}:\n{msg}");
    } else {
        log::error!("panicked:\n{msg}");
    }

    rust_panic()
}

/// Mirroring std, this is an unmangled function on which to slap
/// yer breakpoints for backtracing panics.
#[inline(never)]
#[unsafe(no_mangle)]
fn rust_panic() -> ! {
    arch::halt()
}
