use bsonite::query::builders::{and, eq, exists, gt, in_, inc, lt, ne, nin, not, or, unset};
use bsonite::query::{SortSpec, apply_update, compare_docs, eval_filter, parse_filter_json, parse_update_json};
use bsonite::value::{Decimal128, Value};
use bsonite::doc;

#[test]
fn numbers_compare_across_types() {
    let d = doc! { "n": (Value::Int64(5)), "f": 2.5, "dec": (Decimal128::parse("7.25").unwrap()) };
    assert!(eval_filter(&d, &eq("n", 5)));
    assert!(eval_filter(&d, &eq("n", 5.0)));
    assert!(eval_filter(&d, &gt("dec", 7)));
    assert!(eval_filter(&d, &lt("f", Value::Int64(3))));
    assert!(!eval_filter(&d, &gt("n", "4")));
}

#[test]
fn arrays_match_any_element_and_dotted_paths_fan_out() {
    let d = doc! { "tags": ["a", "b"], "items": [{ "qty": 1 }, { "qty": 9 }] };
    assert!(eval_filter(&d, &eq("tags", "b")));
    assert!(eval_filter(&d, &eq("tags", vec![Value::from("a"), Value::from("b")])));
    assert!(eval_filter(&d, &gt("items.qty", 5)));
    assert!(eval_filter(&d, &eq("items.1.qty", 9)));
    assert!(!eval_filter(&d, &eq("items.0.qty", 9)));
}

#[test]
fn negations_match_missing_fields() {
    let d = doc! { "a": 1 };
    assert!(eval_filter(&d, &ne("b", 1)));
    assert!(eval_filter(&d, &nin("b", [1, 2])));
    assert!(!eval_filter(&d, &in_("b", [1, 2])));
    assert!(eval_filter(&d, &not(exists("b", true))));
}

#[test]
fn logical_combinators() {
    let d = doc! { "age": 30, "city": "Oslo" };
    assert!(eval_filter(&d, &and([gt("age", 18), eq("city", "Oslo")])));
    assert!(eval_filter(&d, &or([eq("city", "Paris"), eq("age", 30)])));
    assert!(!eval_filter(&d, &and([gt("age", 18), eq("city", "Paris")])));
}

#[test]
fn shell_filters_parse_like_builders() {
    let d = doc! { "counter": 60, "name": "x", "sub": { "k": true } };
    for text in [
        "{ counter: { $gt: 50 } }",
        "{ $or: [ { name: 'y' }, { 'sub.k': true } ] }",
        "{ counter: { $gte: 60, $lt: NumberLong(61) }, name: { $in: ['x', 'z'] } }",
        "{ missing: { $exists: false } }",
        "{ counter: { $not: { $lt: 10 } } }",
        "{ $nor: [ { counter: 1 } ] }",
    ] {
        let f = parse_filter_json(text).unwrap();
        assert!(eval_filter(&d, &f), "{text}");
    }
    assert!(parse_filter_json("{ a: { $where: 1 } }").is_err());
    assert!(parse_filter_json("{ $or: {} }").is_err());
}

#[test]
fn updates_parse_and_apply_in_order() {
    let mut d = doc! { "_id": 1, "n": 1, "old": true };
    let u = parse_update_json("{ $inc: { n: 2 }, $set: { 'a.b': 'x' }, $unset: { old: '' } }").unwrap();
    assert!(apply_update(&mut d, &u).unwrap());
    assert_eq!(d, doc! { "_id": 1, "n": 3, "a": { "b": "x" } });
    assert!(!apply_update(&mut d, &unset("old")).unwrap());
    assert!(parse_update_json("{ n: 1 }").is_err());
    assert!(parse_update_json("{}").is_err());
}

#[test]
fn inc_widens_on_overflow_or_keeps_type() {
    let mut d = doc! { "small": 1, "max": (i32::MAX), "f": 1.5 };
    apply_update(&mut d, &inc("small", 1)).unwrap();
    apply_update(&mut d, &inc("max", 1)).unwrap();
    apply_update(&mut d, &inc("f", 1)).unwrap();
    assert_eq!(d.get("small"), Some(&Value::Int32(2)));
    assert_eq!(d.get("max"), Some(&Value::Int64(i64::from(i32::MAX) + 1)));
    assert_eq!(d.get("f"), Some(&Value::Double(2.5)));
}

#[test]
fn sort_orders_type_brackets_then_values() {
    let mut docs = vec![
        doc! { "v": "b" },
        doc! { "v": 2 },
        doc! { "v": null },
        doc! { "x": 1 },
        doc! { "v": 1.5 },
        doc! { "v": "a" },
    ];
    docs.sort_by(|a, b| compare_docs(a, b, &[SortSpec::asc("v")]));
    let rendered: Vec<Option<Value>> = docs.iter().map(|d| d.get("v").cloned()).collect();
    assert_eq!(
        rendered,
        vec![None, Some(Value::Null), Some(Value::Double(1.5)), Some(Value::Int32(2)), Some(Value::from("a")), Some(Value::from("b"))]
    );
}
