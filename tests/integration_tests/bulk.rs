use bsonite::collection::{BulkWriteOptions, WriteModel};
use bsonite::errors::DbError;
use bsonite::query::Filter;
use bsonite::query::builders::{eq, gt, inc};
use bsonite::{Database, doc};

#[test]
fn mixed_batch_reports_every_count() {
    let c = Database::new("shop").collection("stock");
    let models = vec![
        WriteModel::InsertOne { document: doc! { "_id": "a", "qty": 1 } },
        WriteModel::InsertOne { document: doc! { "_id": "b", "qty": 5 } },
        WriteModel::InsertOne { document: doc! { "qty": 9 } },
        WriteModel::UpdateMany { filter: gt("qty", 2), update: inc("qty", -1) },
        WriteModel::DeleteMany { filter: eq("qty", 1) },
    ];
    let r = c.bulk_write(models, BulkWriteOptions::default()).unwrap();
    assert_eq!(r.inserted_count, 3);
    assert_eq!((r.matched_count, r.modified_count), (2, 2));
    assert_eq!(r.deleted_count, 1);
    assert_eq!(r.inserted_ids.keys().copied().collect::<Vec<_>>(), [0, 1, 2]);
    assert_eq!(c.count_documents(&Filter::True), 2);
}

#[test]
fn ordered_batch_keeps_writes_before_the_failure() {
    let c = Database::new("shop").collection("ordered");
    let models = vec![
        WriteModel::InsertOne { document: doc! { "_id": 1, "name": "x" } },
        WriteModel::UpdateOne { filter: eq("_id", 1), update: inc("name", 1) },
        WriteModel::InsertOne { document: doc! { "_id": 2 } },
    ];
    let Err(DbError::BulkWrite(e)) = c.bulk_write(models, BulkWriteOptions::default()) else {
        panic!("expected a bulk write error");
    };
    assert_eq!(e.result.inserted_count, 1);
    assert_eq!(e.write_errors.len(), 1);
    assert!(matches!(e.write_errors[0].error, DbError::TypeMismatch(_)));
    assert_eq!(c.len(), 1);
}

#[test]
fn unordered_batch_attempts_every_model() {
    let c = Database::new("shop").collection("unordered");
    let models = vec![
        WriteModel::InsertOne { document: doc! { "_id": 1 } },
        WriteModel::InsertOne { document: doc! { "_id": 1 } },
        WriteModel::ReplaceOne { filter: eq("_id", 1), replacement: doc! { "_id": 2 } },
        WriteModel::InsertOne { document: doc! { "_id": 3 } },
    ];
    let Err(DbError::BulkWrite(e)) = c.bulk_write(models, BulkWriteOptions { ordered: false }) else {
        panic!("expected a bulk write error");
    };
    let failed: Vec<usize> = e.write_errors.iter().map(|w| w.index).collect();
    assert_eq!(failed, [1, 2]);
    assert_eq!(e.result.inserted_count, 2);
    assert!(e.to_string().starts_with("bulk write failed with 2 error(s)"));
}

#[test]
fn writes_to_an_invalid_namespace_are_refused_up_front() {
    let c = Database::new("shop").collection("bad$name");
    let err = c.bulk_write(vec![WriteModel::DeleteOne { filter: Filter::True }], BulkWriteOptions::default());
    assert!(matches!(err, Err(DbError::InvalidNamespace(_))));
}
