//! Storage backends for package content and debug symbols.
//!
//! Every backend implements [`StorageService`]: write-once `put`, `get` with a
//! distinct not-found error, and idempotent `delete`. Symbol files are
//! addressed through [`symbols::derive_symbol_key`].

pub mod error;
pub mod fs;
pub mod memory;
pub mod path;
pub mod service;
pub mod symbols;

pub use error::{Result, StorageError};
pub use fs::FileSystemStorageService;
pub use memory::MemoryStorageService;
pub use service::{content_from, read_content, ContentStream, StoragePutResult, StorageService};
pub use symbols::{derive_symbol_key, SymbolError, SymbolKey, SymbolStorageService};
