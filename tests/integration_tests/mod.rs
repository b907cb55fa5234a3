// Per-module integration suites.
mod aggregate;
mod bulk;
mod cli;
mod client;
mod codec;
mod collection;
mod config;
mod interop;
mod mapping;
mod query;
mod value;
