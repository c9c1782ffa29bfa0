// src/lib.rs

//! Thread Reconciler Library
//!
//! Folds repeated scans of discussion threads into one cumulative record per
//! thread and a site-wide summary.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;
