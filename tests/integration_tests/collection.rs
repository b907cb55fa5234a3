use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use bsonite::collection::InsertManyOptions;
use bsonite::errors::DbError;
use bsonite::query::builders::{eq, exists, gt, inc, set};
use bsonite::query::{Filter, FindOptions, Projection, SortSpec};
use bsonite::value::{Decimal128, Value};
use bsonite::{Database, doc};

#[test]
fn insert_assigns_an_object_id_first() {
    let db = Database::new("app");
    let people = db.collection("people");
    let mut d = doc! { "name": "ada" };
    let id = people.insert_one(&mut d).unwrap();
    assert!(matches!(id, Value::ObjectId(_)));
    assert_eq!(d.get_index(0).map(|(k, _)| k), Some("_id"));
    assert_eq!(people.find_one(&eq("name", "ada")).unwrap(), d);
}

#[test]
fn duplicate_ids_are_refused() {
    let c = Database::new("app").collection("dups");
    c.insert_one(&mut doc! { "_id": 1 }).unwrap();
    let err = c.insert_one(&mut doc! { "_id": (1i64) }).unwrap_err();
    assert!(matches!(err, DbError::DuplicateKey(_)));
    assert!(err.to_string().contains("app.dups"));
    assert_eq!(c.len(), 1);
}

#[test]
fn decimal_ids_collide_with_equal_integers() {
    let c = Database::new("app").collection("decimal_ids");
    c.insert_one(&mut doc! { "_id": 1 }).unwrap();
    let one = Decimal128::parse("1.0").unwrap();
    assert!(matches!(c.insert_one(&mut doc! { "_id": one }), Err(DbError::DuplicateKey(_))));
    c.insert_one(&mut doc! { "_id": (Decimal128::parse("1.5").unwrap()) }).unwrap();
    assert!(matches!(c.insert_one(&mut doc! { "_id": 1.5 }), Err(DbError::DuplicateKey(_))));
    assert_eq!(c.len(), 2);
}

#[test]
fn insert_many_then_find_returns_unique_ids() {
    let c = Database::new("app").collection("bulk");
    let mut docs: Vec<_> = (0..100).map(|i| doc! { "i": i }).collect();
    let result = c.insert_many(&mut docs, InsertManyOptions::default()).unwrap();
    assert_eq!(result.inserted_ids.len(), 100);
    let found = c.find(Filter::True).to_vec();
    assert_eq!(found.len(), 100);
    let ids: HashSet<String> = found.iter().map(|d| d.id().unwrap().to_string()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn only_borrowed_documents_get_ids_written_back() {
    let c = Database::new("app").collection("writeback");
    let mut borrowed = vec![doc! { "n": 1 }, doc! { "n": 2 }];
    let result = c.insert_many(&mut borrowed, InsertManyOptions::default()).unwrap();
    for (i, d) in borrowed.iter().enumerate() {
        assert_eq!(d.id(), result.inserted_ids.get(&i));
    }

    let owned = vec![doc! { "n": 3 }, doc! { "n": 4 }];
    let kept = owned.clone();
    let result = c.insert_many_iter(owned, InsertManyOptions::default()).unwrap();
    assert_eq!(result.inserted_ids.len(), 2);
    assert!(kept.iter().all(|d| d.id().is_none()));
    for (i, id) in &result.inserted_ids {
        let stored = c.find_one(&eq("_id", id.clone())).unwrap();
        assert_eq!(stored.get_i32("n").unwrap(), 3 + *i as i32);
    }
    assert_eq!(c.len(), 4);
}

#[test]
fn ordered_insert_many_stops_at_first_duplicate() {
    let c = Database::new("app").collection("ordered");
    let mut docs = vec![doc! { "_id": 1 }, doc! { "_id": 1 }, doc! { "_id": 2 }];
    let DbError::BulkWrite(err) = c.insert_many(&mut docs, InsertManyOptions::default()).unwrap_err() else {
        panic!("expected a bulk write error");
    };
    assert_eq!(err.result.inserted_count, 1);
    assert_eq!(err.write_errors[0].index, 1);
    assert_eq!(c.len(), 1);

    let u = Database::new("app").collection("unordered");
    let mut docs = vec![doc! { "_id": 1 }, doc! { "_id": 1 }, doc! { "_id": 2 }];
    assert!(u.insert_many(&mut docs, InsertManyOptions { ordered: false }).is_err());
    assert_eq!(u.len(), 2);
}

#[test]
fn set_is_idempotent() {
    let c = Database::new("app").collection("idem");
    c.insert_one(&mut doc! { "_id": 1, "x": 1 }).unwrap();
    let first = c.update_one(&eq("_id", 1), &set("x", 2)).unwrap();
    assert_eq!((first.matched, first.modified), (1, 1));
    let second = c.update_one(&eq("_id", 1), &set("x", 2)).unwrap();
    assert_eq!((second.matched, second.modified), (1, 0));
}

#[test]
fn failed_update_leaves_documents_untouched() {
    let c = Database::new("app").collection("atomic");
    c.insert_one(&mut doc! { "_id": 1, "name": "x", "n": 1 }).unwrap();
    let err = c.update_one(&eq("_id", 1), &set("n", 5).combine(inc("name", 1))).unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch(_)));
    assert_eq!(c.find_one(&Filter::True).unwrap().get_i32("n").unwrap(), 1);
}

#[test]
fn update_many_counts_matched_and_modified() {
    let c = Database::new("app").collection("many");
    for i in 0..5 {
        c.insert_one(&mut doc! { "i": i, "flag": (i % 2 == 0) }).unwrap();
    }
    let r = c.update_many(&gt("i", 0), &set("flag", true)).unwrap();
    assert_eq!((r.matched, r.modified), (4, 2));
    assert_eq!(c.count_documents(&eq("flag", true)), 5);
}

#[test]
fn deletes_report_counts() {
    let c = Database::new("app").collection("del");
    for i in 0..4 {
        c.insert_one(&mut doc! { "i": i }).unwrap();
    }
    assert_eq!(c.delete_one(&gt("i", 1)).unwrap().deleted, 1);
    assert_eq!(c.delete_many(&Filter::True).unwrap().deleted, 3);
    assert!(c.is_empty());
}

#[test]
fn cursor_is_lazy_and_restartable() {
    let c = Database::new("app").collection("lazy");
    c.insert_one(&mut doc! { "i": 1 }).unwrap();
    let cursor = c.find(exists("i", true));
    assert_eq!(cursor.to_vec().len(), 1);
    c.insert_one(&mut doc! { "i": 2 }).unwrap();
    assert_eq!(cursor.iter().count(), 2);
}

#[test]
fn find_options_apply_sort_skip_limit_then_projection() {
    let c = Database::new("app").collection("opts");
    for (i, name) in ["d", "a", "c", "b"].iter().enumerate() {
        c.insert_one(&mut doc! { "_id": (i as i32), "name": (*name), "secret": "s" }).unwrap();
    }
    let options = FindOptions {
        projection: Some(Projection::new().include("name").exclude("_id")),
        sort: Some(vec![SortSpec::asc("name")]),
        skip: Some(1),
        limit: Some(2),
    };
    let out = c.find_with(Filter::True, options).unwrap().to_vec();
    assert_eq!(out, vec![doc! { "name": "b" }, doc! { "name": "c" }]);

    let mixed = FindOptions { projection: Some(Projection::new().include("a").exclude("b")), ..FindOptions::default() };
    assert!(matches!(c.find_with(Filter::True, mixed), Err(DbError::QueryError(_))));
}

#[test]
fn replace_one_keeps_the_id() {
    let c = Database::new("app").collection("replace");
    c.insert_one(&mut doc! { "_id": 7, "a": 1 }).unwrap();
    let r = c.replace_one(&eq("_id", 7), doc! { "b": 2 }).unwrap();
    assert_eq!(r.modified, 1);
    assert_eq!(c.find_one(&Filter::True).unwrap(), doc! { "_id": 7, "b": 2 });
    assert!(matches!(c.replace_one(&eq("_id", 7), doc! { "_id": 8 }), Err(DbError::ImmutableField(_))));
    assert!(matches!(c.replace_one(&eq("_id", 7), doc! { "$set": { "a": 1 } }), Err(DbError::QueryError(_))));
}

#[test]
fn updating_the_id_is_refused() {
    let c = Database::new("app").collection("immutable");
    c.insert_one(&mut doc! { "_id": 1 }).unwrap();
    assert!(matches!(c.update_one(&Filter::True, &set("_id", 2)), Err(DbError::ImmutableField(_))));
    assert_eq!(c.update_one(&Filter::True, &set("_id", 1)).unwrap().modified, 0);
}

#[test]
fn concurrent_inserts_are_all_kept() {
    let c = Database::new("app").collection("concurrent");
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for i in 0..50 {
                    c.insert_one(&mut doc! { "t": t, "i": i }).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(c.len(), 200);
}
