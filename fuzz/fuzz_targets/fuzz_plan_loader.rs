#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use phaselog::config::PlanLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        let _ = PlanLoader::parse_str(yaml, Path::new("fuzz.yaml"), |name| {
            (name == "SET").then(|| "value".to_owned())
        });
    }
});
