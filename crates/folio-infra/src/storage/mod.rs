//! Media blob storage.

mod local;

pub use local::LocalMediaStorage;
