//! # Agora Core
//!
//! Core types, identifiers, and error definitions shared by the Agora
//! content cache crates. Content items (marketplace listings and forum
//! posts) are described here; the cache and service crates build on them.

pub mod content;
pub mod error;
pub mod id;
pub mod pagination;
pub mod result;
pub mod telemetry;
pub mod validation;

pub use content::*;
pub use error::*;
pub use id::*;
pub use pagination::*;
pub use result::*;
pub use validation::*;

// Re-export shaku for dependency injection
pub use shaku::Interface;
