#![no_main]

use libfuzzer_sys::fuzz_target;
use trailing_breaks::{DomParser, add_trailing_breaks, basic, remove_trailing_breaks};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let Ok(schema) = basic::schema() else {
        return;
    };
    let Ok(doc) = DomParser::from_schema(&schema).parse(&input) else {
        return;
    };
    let added = add_trailing_breaks(&doc);
    assert_eq!(remove_trailing_breaks(&added), doc);
});
