use bsonite::codec::{decode_document, encode_document, parse_json, to_json_string};
use bsonite::value::{Binary, Decimal128, Document, ObjectId, UtcDateTime, Value};
use proptest::prelude::*;

fn decimal() -> impl Strategy<Value = Value> {
    (any::<bool>(), "[0-9]{1,34}", -6176i32..=6111).prop_map(|(negative, digits, exponent)| {
        let sign = if negative { "-" } else { "" };
        Value::Decimal128(Decimal128::parse(&format!("{sign}{digits}E{exponent}")).unwrap())
    })
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Boolean),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(Value::Double),
        decimal(),
        "[a-zA-Z0-9 _\\-\"\\\\]{0,12}".prop_map(Value::String),
        (any::<u8>(), proptest::collection::vec(any::<u8>(), 0..16))
            .prop_map(|(subtype, bytes)| Value::Binary(Binary { subtype, bytes })),
        any::<[u8; 12]>().prop_map(|b| Value::ObjectId(ObjectId::from_bytes(b))),
        any::<i64>().prop_map(|ms| Value::DateTime(UtcDateTime::from_millis(ms))),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|pairs| Value::Document(pairs.into_iter().collect())),
        ]
    })
}

fn document() -> impl Strategy<Value = Document> {
    proptest::collection::vec(("[a-z_]{1,8}", value()), 0..6).prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_binary_round_trip(d in document()) {
        let bytes = encode_document(&d).unwrap();
        prop_assert_eq!(bytes.len(), i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize);
        prop_assert_eq!(decode_document(&bytes).unwrap(), d);
    }

    #[test]
    fn prop_textual_round_trip(d in document()) {
        prop_assert_eq!(parse_json(&to_json_string(&d)).unwrap(), d);
    }

    #[test]
    fn prop_truncated_input_never_decodes(d in document(), cut in 1usize..8) {
        let bytes = encode_document(&d).unwrap();
        let end = bytes.len().saturating_sub(cut);
        prop_assert!(decode_document(&bytes[..end]).is_err());
    }

    #[test]
    fn prop_arbitrary_bytes_do_not_panic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_document(&bytes);
    }
}
