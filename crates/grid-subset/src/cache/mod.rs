//! Caches for repeated subset requests.

mod window_cache;

pub use window_cache::{hash_path, WindowCache, WindowKey};
