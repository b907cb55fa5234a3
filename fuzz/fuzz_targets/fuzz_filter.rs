#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(filter) = bsonite::query::parse_filter_json(s) {
            // a few shapes to exercise the evaluation paths
            let docs = [
                bsonite::doc! {"a": 1, "b": 2, "name": "x"},
                bsonite::doc! {"a": 10, "b": -5, "name": "y", "nested": {"z": 3}},
                bsonite::doc! {"active": true, "tags": ["a", 1.5, null], "items": [{"q": 1}]},
            ];
            for d in &docs {
                let _ = bsonite::query::eval_filter(d, &filter);
            }
        }
    }
});
