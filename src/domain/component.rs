//! Component records and their extension data

use super::ComponentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extension holding the package-level dependency records
pub const DEPENDENCY_RESOLVER_EXTENSION: &str = "scopeup.dependency-resolver";

/// Extension holding build artifacts
pub const BUILDER_EXTENSION: &str = "scopeup.builder";

/// Build/validation state of a component version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    #[default]
    None,
    Pending,
    Succeeded,
    Failed,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::None => write!(f, "none"),
            BuildStatus::Pending => write!(f, "pending"),
            BuildStatus::Succeeded => write!(f, "succeeded"),
            BuildStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Provenance of a component version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub username: String,
    pub email: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

/// A dependency edge from one component to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    /// Target component
    pub id: ComponentId,
    /// Name dependents import the target by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

impl DependencyRef {
    /// Creates a dependency edge without a known package name
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            package_name: None,
        }
    }

    /// Sets the package name (builder pattern)
    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }
}

/// Whether a dependency is needed at runtime or only for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Runtime,
    Dev,
}

/// One package-level dependency record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependency {
    pub component_id: ComponentId,
    pub package_name: String,
    pub version: String,
    pub lifecycle: Lifecycle,
}

/// Payload of the dependency-resolver extension
///
/// Fields other than `dependencies` are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DependencyResolverData {
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A file set produced by one build task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub task: String,
    pub name: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Payload of the builder extension
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuilderData {
    #[serde(default)]
    pub artifacts: Vec<ArtifactRef>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Typed extension payloads, unknown ones kept as raw JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ExtensionData {
    DependencyResolver(DependencyResolverData),
    Builder(BuilderData),
    Custom(serde_json::Value),
}

/// An extension record attached to a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    /// Extension identifier
    pub name: String,
    /// Component implementing the extension, when it is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentId>,
    pub data: ExtensionData,
}

impl Extension {
    /// Creates an extension with raw JSON data
    pub fn custom(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            component: None,
            data: ExtensionData::Custom(data),
        }
    }

    /// Creates an extension implemented by another component
    pub fn from_component(component: ComponentId, data: serde_json::Value) -> Self {
        Self {
            name: component.key().to_string(),
            component: Some(component),
            data: ExtensionData::Custom(data),
        }
    }
}

/// A versioned component as held in a scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: ComponentId,
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
    #[serde(default)]
    pub dev_dependencies: Vec<DependencyRef>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    #[serde(default)]
    pub build_status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogEntry>,
}

impl Component {
    /// Creates a component without dependencies
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            dependencies: Vec::new(),
            dev_dependencies: Vec::new(),
            extensions: Vec::new(),
            build_status: BuildStatus::None,
            log: None,
        }
    }

    /// Adds a runtime dependency (builder pattern)
    pub fn with_dependency(mut self, dependency: DependencyRef) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Adds a development dependency (builder pattern)
    pub fn with_dev_dependency(mut self, dependency: DependencyRef) -> Self {
        self.dev_dependencies.push(dependency);
        self
    }

    /// Adds an extension (builder pattern)
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Finds an extension by name
    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.name == name)
    }

    /// Returns the dependency-resolver payload if present
    pub fn dependency_resolver_data(&self) -> Option<&DependencyResolverData> {
        match self.extension(DEPENDENCY_RESOLVER_EXTENSION).map(|e| &e.data) {
            Some(ExtensionData::DependencyResolver(data)) => Some(data),
            _ => None,
        }
    }

    /// Returns the builder payload if present
    pub fn builder_data(&self) -> Option<&BuilderData> {
        match self.extension(BUILDER_EXTENSION).map(|e| &e.data) {
            Some(ExtensionData::Builder(data)) => Some(data),
            _ => None,
        }
    }

    /// Replaces the dependency records, keeping the other resolver fields
    pub fn set_package_dependencies(&mut self, dependencies: Vec<PackageDependency>) {
        match self
            .extensions
            .iter_mut()
            .find(|e| e.name == DEPENDENCY_RESOLVER_EXTENSION)
        {
            Some(ext) => match &mut ext.data {
                ExtensionData::DependencyResolver(data) => data.dependencies = dependencies,
                other => {
                    // an untyped payload: keep its object fields alongside the records
                    let extra = match other {
                        ExtensionData::Custom(serde_json::Value::Object(map)) => map.clone(),
                        _ => serde_json::Map::new(),
                    };
                    *other = ExtensionData::DependencyResolver(DependencyResolverData {
                        dependencies,
                        extra,
                    });
                }
            },
            None => self.extensions.push(Extension {
                name: DEPENDENCY_RESOLVER_EXTENSION.to_string(),
                component: None,
                data: ExtensionData::DependencyResolver(DependencyResolverData {
                    dependencies,
                    extra: serde_json::Map::new(),
                }),
            }),
        }
    }

    /// Records build artifacts, keeping the other builder fields
    pub fn set_build_artifacts(&mut self, artifacts: Vec<ArtifactRef>) {
        match self
            .extensions
            .iter_mut()
            .find(|e| e.name == BUILDER_EXTENSION)
        {
            Some(ext) => match &mut ext.data {
                ExtensionData::Builder(data) => data.artifacts = artifacts,
                other => {
                    let extra = match other {
                        ExtensionData::Custom(serde_json::Value::Object(map)) => map.clone(),
                        _ => serde_json::Map::new(),
                    };
                    *other = ExtensionData::Builder(BuilderData { artifacts, extra });
                }
            },
            None => self.extensions.push(Extension {
                name: BUILDER_EXTENSION.to_string(),
                component: None,
                data: ExtensionData::Builder(BuilderData {
                    artifacts,
                    extra: serde_json::Map::new(),
                }),
            }),
        }
    }

    /// Iterates runtime then development dependency edges
    pub fn all_dependencies(&self) -> impl Iterator<Item = &DependencyRef> {
        self.dependencies.iter().chain(self.dev_dependencies.iter())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, self.build_status)
    }
}
