//! Fuzz target for bundle container reading.
//!
//! Input bundles come from arbitrary sources (download folders, manual
//! re-zips); reading must never panic, only return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mp_bundle::read_bytes;

fuzz_target!(|data: &[u8]| {
    // Most random data fails the ZIP magic check quickly.
    let _ = read_bytes(data.to_vec());
});
