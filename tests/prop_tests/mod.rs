mod codec;
mod query;
