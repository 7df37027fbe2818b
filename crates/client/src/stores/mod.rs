//! Process-wide client state.

pub mod cache;

pub use cache::{CacheEvent, CacheHandle, QueryKey};
