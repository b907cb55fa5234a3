use bsonite::codec::{decode_document, encode_document};
use bsonite::interop::{decode_with_bson, encode_with_bson};
use bsonite::value::{Decimal128, Document, ObjectId, UtcDateTime, Value};
use bsonite::doc;

const SAMPLE: &[u8] = include_bytes!("../fixtures/sample.bson");

#[test]
fn reference_library_reads_our_fixture() {
    assert_eq!(decode_with_bson(SAMPLE).unwrap(), doc! { "a": 1 });
}

#[test]
fn documents_convert_both_ways() {
    let ours = doc! {
        "_id": (ObjectId::from_bytes([4; 12])),
        "price": (Decimal128::parse("19.99").unwrap()),
        "at": (UtcDateTime::from_millis(-1)),
        "tags": ["a", "b"],
        "n": (Value::Int64(-3))
    };
    let theirs = bson::Document::from(&ours);
    assert_eq!(theirs.get_i64("n").unwrap(), -3);
    assert_eq!(theirs.get_array("tags").unwrap().len(), 2);
    assert_eq!(Document::try_from(&theirs).unwrap(), ours);
    let bytes = encode_with_bson(&ours).unwrap();
    assert_eq!(bytes, encode_document(&ours).unwrap());
    assert_eq!(decode_document(&bytes).unwrap(), ours);
}
