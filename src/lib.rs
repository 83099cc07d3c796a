//! lexsync - synchronization for collaboratively edited lexicons.
//!
//! A project keeps its lexicon in a local SQLite store and shares it
//! through version-controlled repositories handled by an external bridge
//! executable. This crate orchestrates the exchange: exporting the store
//! to an interchange file, merging pulled files back in, rewriting
//! annotation references between URL schemes, detecting merge conflicts,
//! and recording failed imports so they are retried before any further
//! sync.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Lexicon data types (entries, senses, relations)
//! - [`store`] - SQLite store and the advisory repository lock
//! - [`interchange`] - Interchange file format, export, merge import
//! - [`notes`] - Annotation reference transcoding
//! - [`conflict`] - Annotation-log conflict heuristic
//! - [`ledger`] - Crash-safe failure markers
//! - [`bridge`] - Interface to the external bridge executable
//! - [`sync`] - The orchestrator tying it all together
//! - [`config`] - Project layout and discovery
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod error;
pub mod interchange;
pub mod ledger;
pub mod model;
pub mod notes;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
