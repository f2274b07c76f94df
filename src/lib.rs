// src/lib.rs

//! Research-data crate indexer library

pub mod error;
pub mod graph;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
