use std::sync::Arc;

use bsonite::mapping::{ClassMap, FieldMap, Mapper, MappingRule, Representation, RuleScope};
use bsonite::query::builders::{eq, gte};
use bsonite::value::{ObjectId, Value};
use bsonite::{Database, doc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Person {
    id: Option<ObjectId>,
    first_name: String,
    age: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
enum Tier {
    #[default]
    Basic,
    Gold,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Account {
    id: i64,
    balance: f64,
    tier: Tier,
}

#[test]
fn typed_collection_round_trips_with_camel_case_names() {
    let mapper = Arc::new(Mapper::new(vec![MappingRule::CamelCaseElementNames(RuleScope::All)]));
    let db = Database::new("people");
    let people = db.typed_collection::<Person>("people", Arc::clone(&mapper));
    let mut ada = Person { id: None, first_name: "Ada".into(), age: 36 };
    let id = people.insert_one(&mut ada).unwrap();
    assert_eq!(ada.id.map(Value::ObjectId), Some(id));

    let stored = db.collection("people").find_one(&eq("firstName", "Ada")).unwrap();
    assert_eq!(stored.keys().collect::<Vec<_>>(), ["_id", "firstName", "age"]);
    assert_eq!(people.find(&gte("age", 18)).unwrap(), vec![ada]);
}

#[test]
fn representations_change_stored_types() {
    let mapper = Arc::new(Mapper::default());
    mapper.register_class_map::<Account>(
        ClassMap::of::<Account>()
            .unwrap()
            .field(FieldMap::new("balance").representation(Representation::Decimal128))
            .field(FieldMap::new("tier").representation(Representation::enum_of::<Tier>().unwrap())),
    );
    let accounts = Database::new("bank").typed_collection::<Account>("accounts", Arc::clone(&mapper));
    let mut a = Account { id: 7, balance: 30.99, tier: Tier::Gold };
    accounts.insert_one(&mut a).unwrap();

    let raw = accounts.collection().find_one(&eq("_id", 7)).unwrap();
    assert_eq!(raw.get_decimal128("balance").unwrap().to_string(), "30.99");
    assert_eq!(raw.get("tier"), Some(&Value::Int32(1)));
    assert_eq!(accounts.find_one(&eq("_id", 7)).unwrap(), Some(a));
}

#[test]
fn enum_as_string_rule_stores_names() {
    let mapper = Arc::new(Mapper::new(vec![MappingRule::EnumAsString(RuleScope::types(["Account"]))]));
    mapper.register_class_map::<Account>(
        ClassMap::of::<Account>().unwrap().field(FieldMap::new("tier").representation(Representation::enum_of::<Tier>().unwrap())),
    );
    let doc = mapper.to_document(&Account { id: 1, balance: 0.5, tier: Tier::Gold }).unwrap();
    assert_eq!(doc, doc! { "_id": 1, "balance": 0.5, "tier": "Gold" });
}

#[test]
fn strict_maps_reject_unknown_elements() {
    let db = Database::new("strict");
    db.collection("people").insert_one(&mut doc! { "first_name": "x", "age": 1, "extra": true }).unwrap();
    let people = db.typed_collection::<Person>("people", Arc::new(Mapper::default()));
    let err = people.find(&bsonite::query::Filter::True).unwrap_err();
    assert_eq!(err.to_string(), "Element 'extra' does not match any field or property of class Person.");
}

#[test]
fn unregistered_types_round_trip_under_rules() {
    let mapper = Mapper::new(vec![MappingRule::CamelCaseElementNames(RuleScope::All)]);
    let ann = Person { id: None, first_name: "Ann".into(), age: 4 };
    let doc = mapper.to_document(&ann).unwrap();
    assert_eq!(doc, doc! { "firstName": "Ann", "age": 4 });
    assert_eq!(mapper.from_document::<Person>(&doc).unwrap(), ann);
    assert!(mapper.class_map::<Person>().is_some());
}
