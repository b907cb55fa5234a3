use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::codec::{DocumentStream, ReaderSettings, parse_json_documents};
use crate::errors::DbError;
use crate::query::{Projection, SortSpec};
use crate::value::Document;

/// Reads `.json` files as text and anything else as a binary dump.
pub fn load_documents(path: &Path, settings: ReaderSettings) -> Result<Vec<Document>, DbError> {
    let is_json = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let text = std::fs::read_to_string(path)?;
        parse_json_documents(&text, settings)
    } else {
        DocumentStream::with_settings(BufReader::new(File::open(path)?), settings).collect()
    }
}

/// Collection name for a data file: its stem.
pub fn collection_name(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("data").to_string()
}

/// `-age,name` to descending `age` then ascending `name`.
pub fn parse_sort(spec: &str) -> Vec<SortSpec> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('-') {
            Some(field) => SortSpec::desc(field),
            None => SortSpec::asc(s.strip_prefix('+').unwrap_or(s)),
        })
        .collect()
}

/// `name,age` includes; `-secret` excludes.
pub fn parse_projection(spec: &str) -> Projection {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .fold(Projection::new(), |p, s| match s.strip_prefix('-') {
            Some(field) => p.exclude(field),
            None => p.include(s),
        })
}

/// `name=path` for `--with`.
pub fn parse_with(arg: &str) -> Result<(String, std::path::PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name.to_string(), path.into())),
        _ => Err(format!("expected name=path, got '{arg}'")),
    }
}
