#![forbid(unsafe_code)]

pub mod repository;
mod memory;
pub mod sqlite;

pub use memory::InMemoryRepository;
pub use repository::{Page, Storage, StorageError};
