//! Provider resolution.
//!
//! Each capability (storage, metadata database, search, ...) has a
//! [`ProviderSet`]: the backends linked into this build, in registration
//! order, each with an activation predicate over the current
//! [`ConfigSnapshot`](depot_config::ConfigSnapshot). Resolution picks the
//! first active provider and constructs its instance according to the set's
//! [`Lifetime`].

pub mod error;
pub mod provider;
pub mod scope;
pub mod set;

pub use error::{BoxError, InspectedValue, ProviderError, Result};
pub use provider::CapabilityProvider;
pub use scope::{ResolutionContext, Scope};
pub use set::{Lifetime, ProviderSet};
