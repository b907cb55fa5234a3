use bsonite::client::Client;
use bsonite::doc;
use bsonite::errors::DbError;
use bsonite::query::Filter;

#[test]
fn databases_are_isolated_from_each_other() {
    let client = Client::with_uri_str("mongodb://localhost:27017/app").unwrap();
    let app = client.default_database().unwrap();
    app.collection("users").insert_one(&mut doc! { "n": 1 }).unwrap();
    assert_eq!(client.database("other").collection("users").count_documents(&Filter::True), 0);
    assert_eq!(client.list_database_names(), ["app", "other"]);
}

#[test]
fn invalid_database_names_refuse_writes() {
    let client = Client::new();
    let c = client.database("bad.name").collection("c");
    let err = c.insert_one(&mut doc! { "x": 1 }).unwrap_err();
    assert!(matches!(err, DbError::InvalidNamespace(_)));
    assert_eq!(err.to_string(), "Invalid namespace specified 'bad.name.c'.");
}

#[test]
fn system_collections_are_refused() {
    let client = Client::new();
    let c = client.database("app").collection("system.users");
    assert!(matches!(c.insert_one(&mut doc! { "x": 1 }), Err(DbError::InvalidNamespace(_))));
}

#[test]
fn connection_errors_name_the_input() {
    let err = Client::with_uri_str("mongodb://:27017").unwrap_err();
    assert_eq!(err.to_string(), "The connection string 'mongodb://:27017' is not valid.");
}
