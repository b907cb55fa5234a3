use bsonite::codec::{
    DocumentStream, ReaderSettings, decode_document, decode_document_with, encode_document, parse_json,
    parse_json_documents, to_json_string,
};
use bsonite::errors::DbError;
use bsonite::value::{Decimal128, ObjectId, UtcDateTime, Value};
use bsonite::doc;
use chrono::{FixedOffset, NaiveDate};

const SAMPLE: &[u8] = include_bytes!("../fixtures/sample.bson");

#[test]
fn fixture_decodes_to_a_single_int() {
    let d = decode_document(SAMPLE).unwrap();
    assert_eq!(d, doc! { "a": 1 });
    assert_eq!(encode_document(&d).unwrap(), SAMPLE);
    assert_eq!(to_json_string(&d), r#"{ "a" : 1 }"#);
}

#[test]
fn every_truncation_of_the_fixture_is_malformed() {
    for cut in 0..SAMPLE.len() {
        assert!(
            matches!(decode_document(&SAMPLE[..cut]), Err(DbError::MalformedStream(_))),
            "prefix of {cut} bytes decoded"
        );
    }
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = SAMPLE.to_vec();
    bytes.push(0);
    assert!(decode_document(&bytes).is_err());
}

#[test]
fn size_limit_is_enforced() {
    let settings = ReaderSettings { max_document_size: 8, ..ReaderSettings::default() };
    assert!(decode_document_with(SAMPLE, settings).is_err());
}

#[test]
fn stream_reads_concatenated_documents() {
    let mut bytes = Vec::new();
    for i in 0..3 {
        bytes.extend(encode_document(&doc! { "i": i }).unwrap());
    }
    let docs: Vec<_> = DocumentStream::new(bytes.as_slice()).collect::<Result<_, _>>().unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[2].get_i32("i").unwrap(), 2);

    bytes.truncate(bytes.len() - 1);
    let results: Vec<_> = DocumentStream::new(bytes.as_slice()).collect();
    assert_eq!(results.len(), 3);
    assert!(results[2].is_err());
}

#[test]
fn shell_syntax_parses_every_constructor() {
    let d = parse_json(
        r#"{ _id: ObjectId("5f1e1b9a0000000000000001"), 'n': NumberLong(5), i: NumberInt(7),
             dec: NumberDecimal("420.69"), when: ISODate("2000-01-01T00:00:00Z"),
             small: 3, big: 3000000000, f: 1.5 }"#,
    )
    .unwrap();
    assert_eq!(d.get_object_id("_id").unwrap(), ObjectId::parse_str("5f1e1b9a0000000000000001").unwrap());
    assert_eq!(d.get("n"), Some(&Value::Int64(5)));
    assert_eq!(d.get("i"), Some(&Value::Int32(7)));
    assert_eq!(d.get_decimal128("dec").unwrap(), Decimal128::parse("420.69").unwrap());
    assert_eq!(d.get_datetime("when").unwrap().timestamp_millis(), 946_684_800_000);
    assert_eq!(d.get("small"), Some(&Value::Int32(3)));
    assert_eq!(d.get("big"), Some(&Value::Int64(3_000_000_000)));
    assert_eq!(d.get("f"), Some(&Value::Double(1.5)));
}

#[test]
fn textual_round_trip_preserves_values() {
    let d = doc! {
        "_id": (ObjectId::from_bytes([9; 12])),
        "n": (Value::Int64(5)),
        "s": "quote \" and \\ slash",
        "when": (UtcDateTime::from_millis(1_234_567_890_123)),
        "nested": { "xs": [1, 2.5, null, true] }
    };
    assert_eq!(parse_json(&to_json_string(&d)).unwrap(), d);
}

#[test]
fn json_array_files_parse_into_documents() {
    let text = include_str!("../fixtures/sample.json");
    let docs = parse_json_documents(text, ReaderSettings::default()).unwrap();
    assert_eq!(docs.len(), 4);
    assert_eq!(docs[3].get("age"), Some(&Value::Int64(80)));
}

#[test]
fn trailing_commas_are_rejected() {
    assert!(parse_json("{ a: 1, }").is_err());
    assert!(parse_json("{ a: [1, 2,] }").is_err());
}

#[test]
fn naive_times_are_normalized_to_utc() {
    let naive = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    let stored = UtcDateTime::from_naive(naive, &plus_two).unwrap();
    assert_eq!(stored.to_string(), "2020-06-01T10:00:00.000Z");
    let bytes = encode_document(&doc! { "t": stored }).unwrap();
    assert_eq!(decode_document(&bytes).unwrap().get_datetime("t").unwrap(), stored);
}

#[test]
fn dates_beyond_four_digit_years_survive_text() {
    for millis in [i64::MAX, i64::MIN, 253_402_300_800_000, -62_135_596_800_001] {
        let d = doc! { "t": (UtcDateTime::from_millis(millis)) };
        let text = to_json_string(&d);
        assert_eq!(text, format!(r#"{{ "t" : {{ "$date" : {{ "$numberLong" : "{millis}" }} }} }}"#));
        assert_eq!(parse_json(&text).unwrap(), d);
        assert_eq!(bsonite::value::Document::try_from(d.to_json()).unwrap(), d);
    }
    let last = doc! { "t": (UtcDateTime::from_millis(253_402_300_799_999)) };
    assert_eq!(to_json_string(&last), r#"{ "t" : ISODate("9999-12-31T23:59:59.999Z") }"#);
}

#[test]
fn oversized_decimal_literals_are_rejected() {
    let text = format!(r#"{{ d: NumberDecimal("1{}E2147483647") }}"#, "0".repeat(40));
    assert!(parse_json(&text).is_err());
}
