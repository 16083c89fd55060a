//! SQLite backend built on diesel.

pub mod connection;
pub mod migration;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::DbConnection;
pub use repository::SqlitePackageDatabase;
