use std::path::PathBuf;

/// One CLI action, independent of how the arguments were parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every document of a binary dump file as shell JSON, one per line.
    Dump { file: PathBuf },
    /// Encode a JSON document or array of documents into concatenated binary documents.
    Encode { input: PathBuf, output: PathBuf },
    Find {
        /// A binary dump, or a `.json` file holding a document or an array of them.
        file: PathBuf,
        /// Filter in query syntax, e.g. `{age: {$gte: 21}}`.
        filter: Option<String>,
        /// Comma-separated sort fields; a leading `-` sorts descending: `-age,name`.
        sort: Option<String>,
        limit: Option<usize>,
        skip: Option<usize>,
        /// Comma-separated fields to include; a leading `-` excludes instead.
        project: Option<String>,
    },
    Aggregate {
        file: PathBuf,
        /// Pipeline array in query syntax, or the path of a file holding one.
        pipeline: String,
        /// Extra collections for `$lookup`, as `(name, file)`.
        with: Vec<(String, PathBuf)>,
    },
    Info,
}
