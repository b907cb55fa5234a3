use thiserror::Error;

use crate::collection::BulkWriteError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("Malformed stream: {0}")]
    MalformedStream(String),

    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Conversion loses precision: {0}")]
    ConversionPrecisionLoss(String),

    #[error("Element '{0}' not found.")]
    FieldNotFound(String),

    #[error("Invalid namespace specified '{0}'.")]
    InvalidNamespace(String),

    #[error("Performing an update on the path '{0}' would modify the immutable field")]
    ImmutableField(String),

    #[error("Element '{element}' does not match any field or property of class {class}.")]
    UnexpectedElement { element: String, class: String },

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("{0}")]
    BulkWrite(Box<BulkWriteError>),

    #[error("{0}")]
    Configuration(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl DbError {
    /// Short stable name of the error kind, used in bulk write reports and audit lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Toml(_) => "toml",
            Self::Bson(_) => "bson",
            Self::MalformedStream(_) => "malformed_stream",
            Self::UnsupportedValueType(_) => "unsupported_value_type",
            Self::TypeMismatch(_) => "type_mismatch",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::ConversionPrecisionLoss(_) => "conversion_precision_loss",
            Self::FieldNotFound(_) => "field_not_found",
            Self::InvalidNamespace(_) => "invalid_namespace",
            Self::ImmutableField(_) => "immutable_field",
            Self::UnexpectedElement { .. } => "unexpected_element",
            Self::QueryError(_) => "query",
            Self::BulkWrite(_) => "bulk_write",
            Self::Configuration(_) => "configuration",
        }
    }
}
