pub mod annotations;
pub mod config;
pub mod error;
pub mod keys;
pub mod path;
pub mod snapshot;

pub use snapshot::{ConfigSnapshot, ConfigSource};

#[cfg(test)]
pub mod test_utils;
