//! # Index Module
//!
//! Vector index implementations. Only one exists: [`flat::FlatIndex`], an
//! exact full-scan index. At the scale this crate targets (tens of thousands
//! of chunks) a linear scan of unit vectors is fast enough, and exactness
//! keeps search results deterministic and trivially testable.

pub mod flat;
