#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    InMemoryRepository, SessionSnapshot, SnapshotRepository, Storage, StorageError,
};
