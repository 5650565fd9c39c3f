mod cache;

pub use cache::{read_json, write_atomic, write_json, CacheError, JsonCache};
