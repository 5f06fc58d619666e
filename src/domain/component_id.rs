//! Component identifiers
//!
//! Accepted forms:
//! - `scope.name` / `scope.name@1.2.3`
//! - `owner.scope/name/with/namespaces@1.2.3`
//! - `scope.name@latest` (same as no version)

use super::{Version, VersionSpec};
use crate::error::UpdateError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// `<full-name>[@<version-or-spec>]`
static ID_WITH_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^@\s]+)(?:@([^@]*))?$").unwrap());

static SCOPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap());

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*(?:/[A-Za-z0-9][A-Za-z0-9_.\-]*)*$").unwrap());

/// Component identity without a version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKey {
    pub scope: String,
    pub name: String,
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // owner.scope/name reads ambiguously with a dot separator
        if self.scope.contains('.') {
            write!(f, "{}/{}", self.scope, self.name)
        } else {
            write!(f, "{}.{}", self.scope, self.name)
        }
    }
}

/// A component identifier with an optional version
///
/// No version means "unresolved" (latest). Use [`ComponentId::key`] or
/// [`ComponentId::is_same_component`] to compare identities regardless of
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentId {
    pub scope: String,
    pub name: String,
    pub version: Option<Version>,
}

impl ComponentId {
    /// Creates an unversioned identifier
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            version: None,
        }
    }

    /// Returns a copy of this identifier at the given version
    pub fn with_version(&self, version: Version) -> Self {
        Self {
            scope: self.scope.clone(),
            name: self.name.clone(),
            version: Some(version),
        }
    }

    /// Returns a copy of this identifier without a version
    pub fn without_version(&self) -> Self {
        Self::new(self.scope.clone(), self.name.clone())
    }

    /// Identity key ignoring the version
    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            scope: self.scope.clone(),
            name: self.name.clone(),
        }
    }

    /// Returns true if both identifiers name the same component, any version
    pub fn is_same_component(&self, other: &ComponentId) -> bool {
        self.scope == other.scope && self.name == other.name
    }

    /// Parses `id@spec` where spec is a version, range or release token
    ///
    /// A missing spec or `latest` yields the any-version range.
    pub fn parse_with_spec(input: &str) -> Result<(ComponentId, VersionSpec), UpdateError> {
        let (id, raw_spec) = split_id(input)?;
        let spec = match raw_spec {
            Some(raw) => raw.parse::<VersionSpec>()?,
            None => VersionSpec::any(),
        };
        Ok((id, spec))
    }
}

/// Splits the version part off and validates the full name
fn split_id(input: &str) -> Result<(ComponentId, Option<&str>), UpdateError> {
    let input = input.trim();
    let caps = ID_WITH_VERSION_RE
        .captures(input)
        .ok_or_else(|| UpdateError::invalid_component_id(input, "expected <scope>.<name>[@version]"))?;

    let full_name = caps.get(1).map_or("", |m| m.as_str());
    let version = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty() && *v != "latest");

    let (scope, name) = if let Some((scope, name)) = full_name.split_once('/') {
        (scope, name)
    } else if let Some((scope, name)) = full_name.split_once('.') {
        (scope, name)
    } else {
        return Err(UpdateError::invalid_component_id(
            input,
            "missing scope, expected <scope>.<name>",
        ));
    };

    if !SCOPE_RE.is_match(scope) {
        return Err(UpdateError::invalid_component_id(input, "invalid scope name"));
    }
    if !NAME_RE.is_match(name) {
        return Err(UpdateError::invalid_component_id(input, "invalid component name"));
    }

    Ok((ComponentId::new(scope, name), version))
}

impl FromStr for ComponentId {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, version) = split_id(s)?;
        match version {
            Some(raw) => Ok(id.with_version(raw.parse()?)),
            None => Ok(id),
        }
    }
}

impl TryFrom<String> for ComponentId {
    type Error = UpdateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentId> for String {
    fn from(value: ComponentId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())?;
        if let Some(ref version) = self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}
