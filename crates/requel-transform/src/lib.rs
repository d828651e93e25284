//! Structural AST transformations.
//!
//! Transformers operate tree-in, tree-out and preserve the AST
//! invariants: acyclicity, exclusive ownership, structural equality.

pub mod cte;

pub use cte::CteGraph;
