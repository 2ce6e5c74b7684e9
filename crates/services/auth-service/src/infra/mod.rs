//! Infrastructure layer - persisted key/value entries.

mod store;

pub use store::{read_json, write_json, FileStore, KeyValueStore, MemoryStore};

#[cfg(any(test, feature = "test-utils"))]
pub use store::MockKeyValueStore;
