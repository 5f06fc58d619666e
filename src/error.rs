//! Application error types using thiserror
//!
//! Error hierarchy:
//! - UpdateError: fatal problems that abort a batch before commit
//! - ScopeError: failures reading from or persisting to a scope
//! - RemoteError: failures talking to a remote scope
//! - BuildError: the build pipeline could not be run at all
//! - ConfigError: invalid options or request payloads

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Update workflow errors
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scope file could not be opened
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Build command could not be set up
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Errors that abort an update batch
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Component is absent from the scope
    #[error("component {id} was not found in scope '{scope}'")]
    ComponentNotFound { id: String, scope: String },

    /// Explicit version is absent from the component's history
    #[error("version {version} of {id} was not found")]
    VersionNotFound { id: String, version: String },

    /// No known version matches the requested range
    #[error("no version of {id} satisfies '{range}'")]
    UnsatisfiableRange { id: String, range: String },

    /// Version specification could not be used
    #[error("invalid version specification '{spec}': {message}")]
    InvalidVersionSpec { spec: String, message: String },

    /// Component identifier could not be parsed
    #[error("invalid component id '{input}': {message}")]
    InvalidComponentId { input: String, message: String },

    /// Explicit override names a version that already exists
    #[error("version {version} of {id} already exists")]
    VersionAlreadyExists { id: String, version: String },

    /// A matched dependency edge has no resolvable package name
    #[error("unable to find the package name of dependency {dependency} in component {component}")]
    MissingPackageName {
        component: String,
        dependency: String,
    },

    /// The same component was requested twice in one batch
    #[error("component {id} appears more than once in the batch")]
    DuplicateComponent { id: String },

    /// A concurrent fetch task did not complete
    #[error("background task failed: {message}")]
    TaskFailed { message: String },

    /// Scope read or persistence failure
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Remote scope failure
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Invalid options
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to scope (object store) access
#[derive(Error, Debug)]
pub enum ScopeError {
    /// Component could not be found locally or upstream
    #[error("component {id} not found in scope '{scope}'")]
    NotFound { id: String, scope: String },

    /// Reading the scope snapshot failed
    #[error("failed to read scope file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content is malformed
    #[error("failed to parse scope file {path}: {message}")]
    Serialization { path: PathBuf, message: String },

    /// Flushing pending writes failed
    #[error("failed to persist scope '{scope}': {message}")]
    Persistence { scope: String, message: String },
}

/// Errors related to remote scopes
#[derive(Error, Debug)]
pub enum RemoteError {
    /// No remote is configured or reachable for the scope
    #[error("no remote available for scope '{scope}': {message}")]
    Unreachable { scope: String, message: String },

    /// The remote rejected an action
    #[error("remote action '{action}' failed on scope '{scope}': {message}")]
    ActionFailed {
        scope: String,
        action: String,
        message: String,
    },

    /// Exporting the batch failed
    #[error("failed to export to scope '{scope}': {message}")]
    ExportFailed { scope: String, message: String },
}

/// The build pipeline could not run
#[derive(Error, Debug)]
pub enum BuildError {
    /// Spawning or driving the build failed
    #[error("build pipeline failed to run: {message}")]
    Execution { message: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },

    /// Request payload could not be read
    #[error("failed to read request file {path}: {source}")]
    ReadRequest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Request payload is malformed
    #[error("invalid update request: {message}")]
    InvalidRequest { message: String },
}

impl UpdateError {
    /// Creates a new ComponentNotFound error
    pub fn component_not_found(id: impl ToString, scope: impl Into<String>) -> Self {
        UpdateError::ComponentNotFound {
            id: id.to_string(),
            scope: scope.into(),
        }
    }

    /// Creates a new VersionNotFound error
    pub fn version_not_found(id: impl ToString, version: impl ToString) -> Self {
        UpdateError::VersionNotFound {
            id: id.to_string(),
            version: version.to_string(),
        }
    }

    /// Creates a new UnsatisfiableRange error
    pub fn unsatisfiable_range(id: impl ToString, range: impl ToString) -> Self {
        UpdateError::UnsatisfiableRange {
            id: id.to_string(),
            range: range.to_string(),
        }
    }

    /// Creates a new InvalidVersionSpec error
    pub fn invalid_version_spec(spec: impl Into<String>, message: impl Into<String>) -> Self {
        UpdateError::InvalidVersionSpec {
            spec: spec.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidComponentId error
    pub fn invalid_component_id(input: impl Into<String>, message: impl Into<String>) -> Self {
        UpdateError::InvalidComponentId {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates a new MissingPackageName error
    pub fn missing_package_name(component: impl ToString, dependency: impl ToString) -> Self {
        UpdateError::MissingPackageName {
            component: component.to_string(),
            dependency: dependency.to_string(),
        }
    }
}

impl ScopeError {
    /// Creates a new NotFound error
    pub fn not_found(id: impl ToString, scope: impl Into<String>) -> Self {
        ScopeError::NotFound {
            id: id.to_string(),
            scope: scope.into(),
        }
    }

    /// Creates a new Persistence error
    pub fn persistence(scope: impl Into<String>, message: impl Into<String>) -> Self {
        ScopeError::Persistence {
            scope: scope.into(),
            message: message.into(),
        }
    }
}
