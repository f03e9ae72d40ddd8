pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod model;
pub mod path;
pub mod project;
pub mod resolve;
pub mod util;
