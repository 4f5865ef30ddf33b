//! Deterministic, pure logic for the push gate.
//!
//! Core modules must be free of I/O side effects. They operate on loaded
//! documents and file contents and return deterministic outputs suitable for
//! tests. The only clock they consult is the tree differ's budget.

pub mod budget;
pub mod dependencies;
pub mod differ;
pub mod gates;
pub mod path;
pub mod patterns;
pub mod proposal;
pub mod risk;
pub mod scope;
pub mod signature;
pub mod syntax;
pub mod types;
