//! Convenience re-exports for common usage.
//!
//! # Example
//!
//! ```
//! use fixtura_factory::prelude::*;
//!
//! let overrides = AttributeMap::new();
//! assert!(overrides.is_empty());
//! ```

// Error types
pub use crate::error::{FactoryError, FactoryResult};

// Attribute and record types
pub use crate::attribute::{Attribute, AttributeMap, RelationPick};
pub use crate::instance::{Instance, Related};

// Engine types
pub use crate::builder::{FactoryBuilder, Generated};
pub use crate::config::{FactoryConfig, ParentPolicy};
pub use crate::context::{ResolutionContext, StateContext};
pub use crate::factory::Factory;
pub use crate::generator::ValueGenerator;
pub use crate::registry::StatePatch;

// Persistence
pub use crate::persistence::{InMemoryStore, Persistence};
