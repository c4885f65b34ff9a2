#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use svconform_core::{CoercionRules, SymbolicPolicy};
use svconform_syntax::extract_bytes;

fuzz_target!(|data: &[u8]| {
    // Extraction must never panic, whatever the bytes
    match extract_bytes(Path::new("fuzz.sv"), data) {
        Ok(case) => {
            let wildcard = CoercionRules::default().with_symbolic(SymbolicPolicy::Wildcard);
            let text = String::from_utf8_lossy(data);
            // Directives that extracted cleanly must also render, and matching stays cheap on any line
            for directive in &case.directives {
                let _ = directive.render(&CoercionRules::default());
                if let Ok(line) = directive.render(&wildcard) {
                    for candidate in text.lines().take(64) {
                        let _ = line.matches(candidate);
                    }
                }
            }
        }
        Err(malformed) => {
            let _ = malformed.reasons();
        }
    }
});
