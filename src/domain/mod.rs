//! Domain layer for pyscrub
//!
//! CDD Principle: Domain Model - Pure business logic for Python style enforcement
//! - Contains all core entities, value objects, and the static rule catalog
//! - Independent of infrastructure concerns like the file system or the git index
//! - Expresses the ubiquitous language of style violations and scrub outcomes

pub mod rules;
pub mod violations;

// Re-export main domain types for convenience
pub use rules::{rule, RuleSpec, RULES};
pub use violations::*;
