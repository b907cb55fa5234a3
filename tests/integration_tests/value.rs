use bsonite::doc;
use bsonite::errors::DbError;
use bsonite::value::{Decimal128, Document, ObjectId, Value, from_value, to_value};
use serde::{Deserialize, Serialize};

#[test]
fn insert_keeps_position_and_push_appends() {
    let mut d = doc! { "a": 1, "b": 2 };
    d.insert("a", 10);
    d.push("c", 3);
    assert_eq!(d.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
    assert_eq!(d.get_i32("a").unwrap(), 10);
}

#[test]
fn typed_getters_report_missing_and_mismatched() {
    let d = doc! { "s": "x" };
    assert!(matches!(d.get_i32("missing"), Err(DbError::FieldNotFound(_))));
    assert!(d.get_i32("s").is_err());
    assert_eq!(
        DbError::FieldNotFound("missing".into()).to_string(),
        "Element 'missing' not found."
    );
}

#[test]
fn decimal_keeps_text_exactly() {
    for text in ["420.69", "-0.001", "1E+10", "12345678901234567890123456789012"] {
        assert_eq!(Decimal128::parse(text).unwrap().to_string(), text);
    }
    assert!(Decimal128::parse("1.2.3").is_err());
    assert_eq!(Decimal128::parse("30.99").unwrap().to_f64_exact().unwrap(), 30.99);
}

#[test]
fn object_ids_are_unique_and_hex_round_trip() {
    let a = ObjectId::new();
    let b = ObjectId::new();
    assert_ne!(a, b);
    assert_eq!(ObjectId::parse_str(&a.to_hex()).unwrap(), a);
    assert!(ObjectId::parse_str("xyz").is_err());
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Point {
    x: i32,
    label: String,
    id: ObjectId,
}

#[test]
fn serde_host_values_convert() {
    let p = Point { x: 3, label: "p".into(), id: ObjectId::from_bytes([3; 12]) };
    let v = to_value(&p).unwrap();
    let Value::Document(d) = &v else { panic!("expected a document") };
    assert_eq!(d.get_object_id("id").unwrap(), p.id);
    assert_eq!(from_value::<Point>(&v).unwrap(), p);
}

#[test]
fn documents_collect_from_pairs() {
    let d: Document = vec![("a", 1), ("b", 2)].into_iter().collect();
    assert_eq!(d, doc! { "a": 1, "b": 2 });
    assert!(matches!(Value::try_from(u64::MAX), Err(DbError::UnsupportedValueType(_))));
}
