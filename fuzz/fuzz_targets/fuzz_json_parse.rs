#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(doc) = bsonite::codec::parse_json(s) {
            let _ = bsonite::codec::encode_document(&doc);
            let _ = bsonite::codec::to_json_string(&doc);
        }
        let _ = bsonite::codec::parse_json_documents(s, bsonite::codec::ReaderSettings::default());
    }
});
