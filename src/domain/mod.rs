//! Core domain models for scopeup
//!
//! This module contains the fundamental types used throughout the application:
//! - Component identifiers and versions
//! - Version requests (exact, range, release type)
//! - Components with their dependency edges and extension data
//! - Update request payloads, update items and the batch outcome

mod component;
mod component_id;
mod outcome;
mod update_item;
mod version;

pub use component::{
    ArtifactRef, BuildStatus, BuilderData, Component, DependencyRef, DependencyResolverData,
    Extension, ExtensionData, Lifecycle, LogEntry, PackageDependency, BUILDER_EXTENSION,
    DEPENDENCY_RESOLVER_EXTENSION,
};
pub use component_id::{ComponentId, ComponentKey};
pub use outcome::UpdateOutcome;
pub use update_item::{DepUpdateRequestItem, ReleaseMode, UpdateItem, UpdateOptions};
pub use version::{ReleaseType, Version, VersionSpec, DEFAULT_PRERELEASE_ID, SNAP_HASH_LEN};
