//! Wires depot's capabilities together.
//!
//! [`Capabilities`] holds one provider set per capability. A
//! [`DepotContext`] pairs them with the current configuration snapshot and
//! hands out [`DepotScope`]s, one per unit of work, from which storage, the
//! package database, search and symbol storage are resolved.

pub mod capabilities;
pub mod context;
pub mod error;
pub mod search;

pub use capabilities::{Capabilities, CapabilitiesBuilder, CapabilitySummary};
pub use context::{DepotContext, DepotScope, StartupReport};
pub use error::{DepotError, ErrorContext};
pub use search::{
    DatabaseSearchService, NullSearchService, SearchRequest, SearchResponse, SearchService,
};

pub type DepotResult<T> = std::result::Result<T, DepotError>;
