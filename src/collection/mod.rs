mod bulk;
mod core;
mod ops;

pub use bulk::{BulkWriteError, BulkWriteOptions, BulkWriteResult, WriteError, WriteModel};
pub use self::core::{Collection, is_valid_collection_name, is_valid_database_name};
pub use ops::{InsertManyOptions, InsertManyResult};
