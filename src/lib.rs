// Corpus Helper - search, vector-bagging and websocket helper service
// Core library module
//
// Three coupled subsystems share this process:
// [1] the search pool drains pre-rolled SQL descriptors from the queue store,
//     executes them against PostgreSQL and stores the hits back as a result set
// [2] the bagger reuses the row-extraction path and post-processes the rows
//     into lemmatized bags of words for a downstream vector-modeling stage
// [3] the poll broadcaster mirrors the progress counters over a websocket
//
// The library entry points exist for embedded use but the standalone binary
// is the primary path.

pub mod bagger;
pub mod capi;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod poll;
pub mod report;
pub mod search;
pub mod store;

pub use error::{HelperError, Result};

pub const MYNAME: &str = "Corpus Helper";
pub const SHORTNAME: &str = "CH";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Expected length of one corpus line, used to pre-size the text block builder.
pub const LINE_LENGTH: usize = 72;
