#![no_main]

use libfuzzer_sys::fuzz_target;
use phaselog::PhaseRegistry;

fuzz_target!(|data: &[u8]| {
    let Ok(registry) = serde_json::from_slice::<PhaseRegistry>(data) else {
        return;
    };

    // Anything accepted must survive a second round trip unchanged.
    let text = serde_json::to_string(&registry).expect("registry serializes");
    let again: PhaseRegistry = serde_json::from_str(&text).expect("own output parses");
    assert_eq!(again, registry);
});
