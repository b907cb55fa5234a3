#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 65536 { return; }
    if let Ok(doc) = bsonite::codec::decode_document(data) {
        // whatever decodes must survive a second round trip
        let bytes = bsonite::codec::encode_document(&doc).unwrap();
        let again = bsonite::codec::decode_document(&bytes).unwrap();
        assert_eq!(bsonite::codec::encode_document(&again).unwrap(), bytes);
    }
    for item in bsonite::codec::DocumentStream::new(data) {
        if item.is_err() { break; }
    }
});
