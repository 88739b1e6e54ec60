#![no_main]

use libfuzzer_sys::fuzz_target;
use trailing_breaks::{add_trailing_breaks_json, basic, remove_trailing_breaks_json};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(schema) = basic::schema() else {
        return;
    };
    if let Ok(added) = add_trailing_breaks_json(&schema, &value) {
        let _ = remove_trailing_breaks_json(&schema, &added);
    }
});
