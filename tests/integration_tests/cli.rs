use std::fs;
use std::path::PathBuf;

use bsonite::cli::{Command, OutputMode, run, run_with_format};
use bsonite::config::Config;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn output(cmd: &Command) -> String {
    let mut out = Vec::new();
    run(cmd, &Config::default(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn dump_prints_one_document_per_line() {
    assert_eq!(output(&Command::Dump { file: fixture("sample.bson") }), "{ \"a\" : 1 }\n");
}

#[test]
fn encode_then_dump_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.json");
    let encoded = dir.path().join("out.bson");
    fs::write(&input, "{ a: 1 } { b: NumberLong(2) }").unwrap();
    let report = output(&Command::Encode { input, output: encoded.clone() });
    assert!(report.starts_with("encoded 2 document(s)"));
    assert_eq!(output(&Command::Dump { file: encoded }), "{ \"a\" : 1 }\n{ \"b\" : NumberLong(2) }\n");
}

#[test]
fn find_applies_filter_sort_and_projection() {
    let cmd = Command::Find {
        file: fixture("sample.json"),
        filter: Some("{ age: { $gte: 80 } }".into()),
        sort: Some("-age".into()),
        limit: None,
        skip: None,
        project: Some("name,-_id".into()),
    };
    assert_eq!(output(&cmd), "{ \"name\" : \"grace\" }\n{ \"name\" : \"ken\" }\n");
}

#[test]
fn find_with_a_bad_filter_fails() {
    let cmd = Command::Find {
        file: fixture("sample.json"),
        filter: Some("{ age: { $near: 1 } }".into()),
        sort: None,
        limit: None,
        skip: None,
        project: None,
    };
    assert!(run(&cmd, &Config::default(), &mut Vec::new()).is_err());
}

#[test]
fn aggregate_joins_extra_collections() {
    let dir = tempfile::tempdir().unwrap();
    let orders = dir.path().join("orders.json");
    fs::write(&orders, r#"[{ _id: 10, person: 2, item: "tape" }, { _id: 11, person: 9, item: "pen" }]"#).unwrap();
    let cmd = Command::Aggregate {
        file: orders,
        pipeline: r#"[ { $lookup: { from: "sample", localField: "person", foreignField: "_id", as: "who" } },
                       { $unwind: "$who" },
                       { $project: { _id: 0, item: 1, "who.name": 1 } } ]"#
            .into(),
        with: vec![("sample".into(), fixture("sample.json"))],
    };
    assert_eq!(output(&cmd), "{ \"item\" : \"tape\", \"who\" : { \"name\" : \"grace\" } }\n");
}

#[test]
fn info_reports_limits() {
    let text = output(&Command::Info);
    assert!(text.starts_with(concat!("bsonite ", env!("CARGO_PKG_VERSION"))));
    assert!(text.contains("max_document_size: 16777216"));

    let mut out = Vec::new();
    run_with_format(&Command::Info, &Config::default(), &mut out, OutputMode::Json).unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["name"], "bsonite");
}
