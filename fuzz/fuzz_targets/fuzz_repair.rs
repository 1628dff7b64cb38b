//! Fuzz target for structural repair.
//!
//! Repair is a pure transform over arbitrary entry names; it must never
//! panic and must never produce an entry with a junk name.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mp_bundle::{is_junk, repair_entries, Entry};

fuzz_target!(|names: Vec<String>| {
    let entries: Vec<Entry> = names
        .into_iter()
        .map(|name| Entry::new(name, Vec::new()))
        .collect();

    let cleaned = repair_entries(entries);

    for entry in &cleaned {
        assert!(!is_junk(&entry.name));
        assert!(!entry.name.ends_with('/'));
    }
});
