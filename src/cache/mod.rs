// Cache module for the latest polled value of every source.
// Shared between background refresh tasks (writers) and HTTP handlers (readers).

pub mod store;

pub use store::{CacheEntry, CacheStore};
