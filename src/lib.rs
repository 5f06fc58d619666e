//! scopeup - batch component updater library
//!
//! Advances a batch of versioned components together:
//! - pins requested dependencies to exact versions from the scope history
//! - plans each member's next version (semantic release or snapshot)
//! - rewrites dependency edges so batch members reference each other's new versions
//! - builds the batch and commits it with its build status

pub mod build;
pub mod cli;
pub mod domain;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod scope;
pub mod update;
