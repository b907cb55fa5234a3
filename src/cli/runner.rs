use std::io::Write;
use std::path::Path;

use crate::Database;
use crate::aggregate::Pipeline;
use crate::codec::{encode_document, parse_json_documents, parse_json_value, to_json_string_with};
use crate::config::Config;
use crate::errors::DbError;
use crate::query::{Filter, FindOptions};
use crate::value::{Document, Value};

use super::command::Command;
use super::util::{collection_name, load_documents, parse_projection, parse_sort};

include!(concat!(env!("OUT_DIR"), "/compiled_features.rs"));

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OutputMode {
    /// Shell syntax: `ObjectId("..")`, `NumberLong(..)`, `ISODate("..")`.
    #[default]
    Shell,
    /// Relaxed extended JSON.
    Json,
}

/// Runs `cmd` with shell output.
///
/// # Errors
/// Any I/O, codec or query error of the command.
pub fn run(cmd: &Command, cfg: &Config, out: &mut dyn Write) -> Result<(), DbError> {
    run_with_format(cmd, cfg, out, OutputMode::Shell)
}

/// # Errors
/// As [`run`].
pub fn run_with_format(cmd: &Command, cfg: &Config, out: &mut dyn Write, mode: OutputMode) -> Result<(), DbError> {
    match cmd {
        Command::Dump { file } => {
            for doc in load_documents(file, cfg.reader_settings())? {
                print_doc(out, &doc, cfg, mode)?;
            }
            Ok(())
        }
        Command::Encode { input, output } => {
            let text = std::fs::read_to_string(input)?;
            let docs = parse_json_documents(&text, cfg.reader_settings())?;
            let mut bytes = Vec::new();
            for doc in &docs {
                bytes.extend(encode_document(doc)?);
            }
            std::fs::write(output, &bytes)?;
            log::info!("encoded {} document(s) into {}", docs.len(), output.display());
            writeln!(out, "encoded {} document(s), {} bytes", docs.len(), bytes.len())?;
            Ok(())
        }
        Command::Find { file, filter, sort, limit, skip, project } => {
            let db = Database::new(cfg.default_database.as_deref().unwrap_or("cli"));
            let collection = load_into(&db, &collection_name(file), file, cfg)?;
            let filter = match filter {
                Some(text) => Filter::from_document(&parse_json_arg(text, cfg)?)?,
                None => Filter::True,
            };
            let options = FindOptions {
                projection: project.as_deref().map(parse_projection),
                sort: sort.as_deref().map(parse_sort),
                skip: *skip,
                limit: *limit,
            };
            for doc in &collection.find_with(filter, options)? {
                print_doc(out, &doc, cfg, mode)?;
            }
            Ok(())
        }
        Command::Aggregate { file, pipeline, with } => {
            let db = Database::new(cfg.default_database.as_deref().unwrap_or("cli"));
            let source = collection_name(file);
            load_into(&db, &source, file, cfg)?;
            for (name, path) in with {
                load_into(&db, name, path, cfg)?;
            }
            let text = if Path::new(pipeline).is_file() { std::fs::read_to_string(pipeline)? } else { pipeline.clone() };
            let stages = match parse_json_value(&text)? {
                Value::Array(items) => items
                    .into_iter()
                    .map(|v| match v {
                        Value::Document(d) => Ok(d),
                        other => Err(DbError::QueryError(format!("pipeline stage is a {}", other.type_name()))),
                    })
                    .collect::<Result<Vec<Document>, _>>()?,
                Value::Document(d) => vec![d],
                other => return Err(DbError::QueryError(format!("pipeline must be an array, got {}", other.type_name()))),
            };
            let pipeline = Pipeline::from_documents(&stages)?;
            for doc in db.aggregate(&source, &pipeline)? {
                print_doc(out, &doc, cfg, mode)?;
            }
            Ok(())
        }
        Command::Info => {
            match mode {
                OutputMode::Json => {
                    let report = serde_json::json!({
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                        "compiled_features": COMPILED_FEATURES,
                        "config": cfg,
                        "metrics": crate::telemetry::metrics_snapshot(),
                    });
                    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
                }
                OutputMode::Shell => {
                    writeln!(out, "{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
                    writeln!(
                        out,
                        "compiled_features: {}",
                        if COMPILED_FEATURES.is_empty() { "(none)".to_string() } else { COMPILED_FEATURES.join(",") }
                    )?;
                    writeln!(out, "max_document_size: {}", cfg.codec.max_document_size)?;
                    writeln!(out, "max_depth: {}", cfg.codec.max_depth)?;
                    if let Some(db) = &cfg.default_database {
                        writeln!(out, "default_database: {db}")?;
                    }
                }
            }
            Ok(())
        }
    }
}

fn parse_json_arg(text: &str, cfg: &Config) -> Result<Document, DbError> {
    crate::codec::parse_json_with(text, cfg.reader_settings())
}

fn load_into(
    db: &Database,
    name: &str,
    path: &Path,
    cfg: &Config,
) -> Result<std::sync::Arc<crate::collection::Collection>, DbError> {
    let collection = db.collection(name);
    let docs = load_documents(path, cfg.reader_settings())?;
    log::debug!("loading {} document(s) from {} into {name}", docs.len(), path.display());
    collection.insert_many_iter(docs, crate::collection::InsertManyOptions::default())?;
    Ok(collection)
}

fn print_doc(out: &mut dyn Write, doc: &Document, cfg: &Config, mode: OutputMode) -> Result<(), DbError> {
    match mode {
        OutputMode::Shell => writeln!(out, "{}", to_json_string_with(doc, &cfg.writer_settings()))?,
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string(&doc.to_json())?)?,
    }
    Ok(())
}
