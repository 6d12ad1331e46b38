//! The `LazyBuilder` and its build-freshness check.

pub mod freshness;
pub mod lazy_builder;

pub use self::lazy_builder::{BuildMessage, LazyBuilder};
