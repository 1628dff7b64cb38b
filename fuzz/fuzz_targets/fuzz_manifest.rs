//! Fuzz target for plate manifest parsing.
//!
//! The manifest XML is attacker-controlled content inside the archive;
//! parsing must only ever return an error on malformed input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mp_core::manifest::parse_plates;

fuzz_target!(|xml: &str| {
    let _ = parse_plates(xml);
});
