#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(update) = bsonite::query::parse_update_json(s) {
            let mut d = bsonite::doc! {"_id": 1, "n": 1, "s": "x", "arr": [1, 2], "sub": {"k": 1}};
            let _ = bsonite::query::apply_update(&mut d, &update);
        }
    }
});
