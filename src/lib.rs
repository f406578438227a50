// src/lib.rs

//! Sprout Monitor Library
//!
//! Incremental crawler for announcement listings: paginated list pages,
//! linked detail pages, and an append-only CSV store per target.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
