//! This crate implements an external sort for CSV and other delimited files that do not fit
//! in memory.
//!
//! The input is split into chunk files of a bounded approximate size, each chunk is sorted in
//! memory, in parallel when requested, and the sorted chunks are merged a few at a time with
//! a k-way merge until one sorted file remains. Peak memory is bounded by the chunk size and
//! the number of files merged at once, at the cost of one pass over the data per merge level.
//!
//! Records are sorted by one or more columns, selected by position or by header name,
//! compared as text or as numbers. The sort is stable: records with equal keys keep their
//! input order. The header, when present, is kept as the first record of the output.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use csv_file_sort::column::Column;
//! use csv_file_sort::sort::Sort;
//!
//! fn sort_by_city(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut csv_file_sort = Sort::new(vec![input], output);
//!     csv_file_sort.add_column(Column::from("city"));
//!
//!     // set number of CPU cores used to sort chunks. The default is to use all available
//!     // cores.
//!     csv_file_sort.with_tasks(2);
//!
//!     // split the input in chunks of about 64 MB
//!     csv_file_sort.with_chunk_size_mb(64);
//!
//!     // merge up to 8 sorted chunks at once
//!     csv_file_sort.with_fan_in(8);
//!
//!     // set the directory for intermediate results. The default is the system temp dir -
//!     // std::env::temp_dir().
//!     csv_file_sort.with_tmp_dir(tmp);
//!
//!     csv_file_sort.sort()
//! }
//! ```
//!
//! Failures are returned as [anyhow::Error]. Column resolution, numeric parsing and I/O
//! failures carry an [error::SortError] that can be recovered with `downcast_ref`.

pub(crate) mod config;
pub(crate) mod key;
pub(crate) mod keyed_record;
pub(crate) mod workspace;
pub(crate) mod splitter;
pub(crate) mod sort_command;
pub(crate) mod chunk_cursor;
pub(crate) mod merge;

pub mod sort;
pub mod column;
pub mod error;
