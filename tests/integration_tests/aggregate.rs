use bsonite::aggregate::{Pipeline, Stage, stages};
use bsonite::codec::parse_json_value;
use bsonite::query::builders::{eq, gte};
use bsonite::query::{Projection, SortSpec};
use bsonite::value::Value;
use bsonite::{Database, doc};

fn people_with_addresses() -> Database {
    let db = Database::new("directory");
    let people = db.collection("people");
    let addresses = db.collection("addresses");
    people.insert_one(&mut doc! { "_id": 1, "name": "ada", "age": 36, "address_id": 10 }).unwrap();
    people.insert_one(&mut doc! { "_id": 2, "name": "bob", "age": 17, "address_id": 11 }).unwrap();
    people.insert_one(&mut doc! { "_id": 3, "name": "cy", "age": 52 }).unwrap();
    addresses.insert_one(&mut doc! { "_id": 10, "city": "Paris" }).unwrap();
    addresses.insert_one(&mut doc! { "_id": 11, "city": "Oslo" }).unwrap();
    db
}

#[test]
fn lookup_unwind_project_joins_each_person_to_one_address() {
    let db = people_with_addresses();
    let pipeline = Pipeline::new(vec![
        stages::lookup("addresses", "address_id", "_id", "address"),
        stages::unwind("$address"),
        stages::project(Projection::new().include("name").include("address.city").exclude("_id")),
        stages::sort([SortSpec::asc("name")]),
    ]);
    let out = db.aggregate("people", &pipeline).unwrap();
    assert_eq!(
        out,
        vec![
            doc! { "name": "ada", "address": { "city": "Paris" } },
            doc! { "name": "bob", "address": { "city": "Oslo" } },
        ]
    );
}

#[test]
fn match_then_count_counts_adults() {
    let db = people_with_addresses();
    let pipeline = Pipeline::new(vec![stages::match_(gte("age", 18)), stages::count("adults")]);
    assert_eq!(db.aggregate("people", &pipeline).unwrap(), vec![doc! { "adults": 2 }]);

    let none = Pipeline::new(vec![stages::match_(eq("age", 200)), stages::count("adults")]);
    assert!(db.aggregate("people", &none).unwrap().is_empty());
}

#[test]
fn lookup_from_an_unknown_collection_yields_empty_arrays() {
    let db = people_with_addresses();
    let pipeline = Pipeline::new(vec![stages::match_(eq("_id", 1)), stages::lookup("nowhere", "address_id", "_id", "x")]);
    let out = db.aggregate("people", &pipeline).unwrap();
    assert_eq!(out[0].get_array("x").unwrap().len(), 0);
}

#[test]
fn sort_skip_limit_page_through_results() {
    let db = people_with_addresses();
    let pipeline = Pipeline::new(vec![
        stages::sort([SortSpec::desc("age")]),
        stages::skip(1),
        stages::limit(1),
        stages::project(Projection::new().include("name").exclude("_id")),
    ]);
    assert_eq!(db.aggregate("people", &pipeline).unwrap(), vec![doc! { "name": "ada" }]);
}

#[test]
fn pipelines_parse_from_shell_text() {
    let db = people_with_addresses();
    let Value::Array(stage_values) = parse_json_value(
        r#"[ { $match: { age: { $lt: 40 } } },
             { $lookup: { from: "addresses", localField: "address_id", foreignField: "_id", as: "a" } },
             { $unwind: { path: "$a", preserveNullAndEmptyArrays: false } },
             { $sort: { age: -1 } },
             { $project: { _id: 0, city: "$a.city" } } ]"#,
    )
    .unwrap() else {
        panic!("expected an array");
    };
    let docs: Vec<_> = stage_values.into_iter().filter_map(|v| v.as_document().cloned()).collect();
    let pipeline = Pipeline::from_documents(&docs);
    // computed projections are not supported
    assert!(pipeline.is_err());

    let docs: Vec<_> = docs[..4].to_vec();
    let pipeline = Pipeline::from_documents(&docs).unwrap();
    assert!(matches!(pipeline.stages()[2], Stage::Unwind(_)));
    let out = db.aggregate("people", &pipeline).unwrap();
    let cities: Vec<&str> = out.iter().map(|d| d.get_document("a").unwrap().get_str("city").unwrap()).collect();
    assert_eq!(cities, ["Paris", "Oslo"]);
}

#[test]
fn invalid_pipelines_fail_before_running() {
    let db = people_with_addresses();
    let mixed = Pipeline::new(vec![stages::project(Projection::new().include("a").exclude("b"))]);
    assert!(db.aggregate("people", &mixed).is_err());
    assert!(db.aggregate("people", &Pipeline::new(vec![stages::count("$n")])).is_err());
}
