// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A per-vnode query execution pipeline for a time-series table.
//!
//! ##### NOTE
//!
//! > This crate implements the read-side scan/aggregate/interpolate
//! > pipeline over an already-written day-file set. It does not write
//! > data, manage the write-ahead log, or coordinate multiple vnodes —
//! > those are external collaborators (see [`collaborators`]).
//!
//! ##### About
//!
//! A table's data lives across a rolling set of day-files plus an
//! in-memory cache ring for the newest, not-yet-flushed rows. A query
//! against one table:
//!
//! 1. Resolves the table's block index per day-file ([`descriptor`]).
//! 2. Locates candidate blocks for its key range ([`locator`]).
//! 3. Decides how much of each block to load ([`loader`]).
//! 4. Walks rows via a unified disk/cache cursor ([`position`],
//!    [`cache_ring`]), decoding columns on demand ([`block`]).
//! 5. Feeds rows into per-window aggregation contexts ([`agg`],
//!    [`window`]), running a second reversed pass when a
//!    direction-sensitive aggregate demands it ([`scanner`]).
//! 6. Fills gaps ([`interp`]) and pages results back to the caller
//!    ([`pager`]).
//!
//! [`engine::ScanEngine`] is the call site that actually drives steps
//! 2-6 for one table; everything else above is a component it composes.
//!
//! # Example
//!
//! ```
//! use vnode_query_engine::Config;
//!
//! # let folder = tempfile::tempdir()?;
//! let config = Config::new(folder.path());
//! # Ok::<(), vnode_query_engine::Error>(())
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod agg;
pub mod binary_search;
pub mod block;
pub mod cache;
pub mod cache_ring;
pub mod checksum;
pub mod coding;
pub mod collaborators;
pub mod compression;
pub mod config;
pub mod descriptor;
pub mod engine;
mod error;
pub mod fd_table;
pub mod file;
pub mod hash;
pub mod interp;
pub mod loader;
pub mod locator;
pub mod pager;
pub mod path;
pub mod position;
pub mod query;
pub mod registry;
pub mod schema;
pub mod scanner;
pub mod spill;
pub mod window;

pub use config::{Config, Precision};
pub use error::{Error, Result};
pub use query::Query;
