//! Version types for components
//!
//! A component version is either a semantic release (`1.2.3`) or a
//! content-addressed snapshot token (64 lowercase hex digits). Requests use
//! [`VersionSpec`] to say which version they want:
//! - explicit: `1.2.3`
//! - range: `^1.0.0`, `~1.2`, `>=1.0.0, <2.0.0`, `*`
//! - release type: `patch`, `minor`, `major`, `prerelease`

use crate::error::UpdateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a snapshot token in hex digits
pub const SNAP_HASH_LEN: usize = 64;

/// Prerelease identifier used when none is configured
pub const DEFAULT_PRERELEASE_ID: &str = "dev";

/// A concrete component version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Version {
    /// Semantic release version
    Release(semver::Version),
    /// Content-addressed snapshot token
    Snap(String),
}

impl Version {
    /// Creates a snapshot version from a hex digest
    pub fn snap(hash: impl Into<String>) -> Result<Self, UpdateError> {
        let hash = hash.into();
        if is_snap_hash(&hash) {
            Ok(Version::Snap(hash))
        } else {
            Err(UpdateError::invalid_version_spec(
                hash,
                "snapshot tokens are 64 lowercase hex digits",
            ))
        }
    }

    /// Returns the semantic version if this is a release
    pub fn as_release(&self) -> Option<&semver::Version> {
        match self {
            Version::Release(v) => Some(v),
            Version::Snap(_) => None,
        }
    }

    /// Returns true if this is a snapshot token
    pub fn is_snap(&self) -> bool {
        matches!(self, Version::Snap(_))
    }
}

fn is_snap_hash(s: &str) -> bool {
    s.len() == SNAP_HASH_LEN && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = semver::Version::parse(s) {
            return Ok(Version::Release(v));
        }
        if is_snap_hash(s) {
            return Ok(Version::Snap(s.to_string()));
        }
        Err(UpdateError::invalid_version_spec(
            s,
            "expected a semantic version or a snapshot token",
        ))
    }
}

impl TryFrom<String> for Version {
    type Error = UpdateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

impl From<semver::Version> for Version {
    fn from(value: semver::Version) -> Self {
        Version::Release(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Release(v) => write!(f, "{}", v),
            Version::Snap(hash) => write!(f, "{}", hash),
        }
    }
}

/// How the next release version is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Patch,
    Minor,
    Major,
    /// Prerelease of the next patch (`1.2.4-dev.0`), or the next prerelease
    /// number when the current version is already one
    #[serde(alias = "pre-release")]
    PreRelease,
}

impl ReleaseType {
    /// Returns the token used in requests
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Patch => "patch",
            ReleaseType::Minor => "minor",
            ReleaseType::Major => "major",
            ReleaseType::PreRelease => "prerelease",
        }
    }

    /// Computes the version that follows `current`
    ///
    /// With no current version the initial version for the release type is
    /// returned (`0.0.1`, `0.1.0`, `1.0.0`, `0.0.1-<id>.0`).
    pub fn bump(
        &self,
        current: Option<&semver::Version>,
        prerelease_id: &str,
    ) -> Result<semver::Version, UpdateError> {
        let base = current
            .cloned()
            .unwrap_or_else(|| semver::Version::new(0, 0, 0));
        let is_pre = !base.pre.is_empty();

        let mut next = semver::Version::new(base.major, base.minor, base.patch);
        match self {
            ReleaseType::Patch => {
                if !is_pre {
                    next.patch += 1;
                }
            }
            ReleaseType::Minor => {
                if !(is_pre && base.patch == 0) {
                    next.minor += 1;
                    next.patch = 0;
                }
            }
            ReleaseType::Major => {
                if !(is_pre && base.minor == 0 && base.patch == 0) {
                    next.major += 1;
                    next.minor = 0;
                    next.patch = 0;
                }
            }
            ReleaseType::PreRelease => {
                let pre = match next_prerelease_number(&base.pre, prerelease_id) {
                    Some(n) if is_pre => format!("{}.{}", prerelease_id, n),
                    _ => format!("{}.0", prerelease_id),
                };
                next.pre = semver::Prerelease::new(&pre).map_err(|e| {
                    UpdateError::invalid_version_spec(prerelease_id, e.to_string())
                })?;
                // a different identifier may sort below the current prerelease
                if !is_pre || next <= base {
                    next.patch += 1;
                }
            }
        }

        Ok(next)
    }
}

/// Returns the number following an existing `<id>.<n>` prerelease
fn next_prerelease_number(pre: &semver::Prerelease, id: &str) -> Option<u64> {
    let rest = pre.as_str().strip_prefix(id)?.strip_prefix('.')?;
    rest.parse::<u64>().ok().map(|n| n + 1)
}

impl FromStr for ReleaseType {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" => Ok(ReleaseType::Patch),
            "minor" => Ok(ReleaseType::Minor),
            "major" => Ok(ReleaseType::Major),
            "prerelease" | "pre-release" => Ok(ReleaseType::PreRelease),
            other => Err(UpdateError::invalid_version_spec(
                other,
                "expected patch, minor, major or prerelease",
            )),
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionSpec {
    /// Exact version (`1.2.3` or a snapshot token)
    Exact(Version),
    /// Semver range (`^1.0.0`, `*`)
    Range(semver::VersionReq),
    /// Release-type token (`patch`, `minor`, ...)
    Release(ReleaseType),
}

impl VersionSpec {
    /// Any version
    pub fn any() -> Self {
        VersionSpec::Range(semver::VersionReq::STAR)
    }

    /// Returns true if this is an explicit version
    pub fn is_exact(&self) -> bool {
        matches!(self, VersionSpec::Exact(_))
    }
}

impl Default for VersionSpec {
    fn default() -> Self {
        Self::any()
    }
}

impl FromStr for VersionSpec {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "latest" {
            return Ok(Self::any());
        }
        if let Ok(release) = s.parse::<ReleaseType>() {
            return Ok(VersionSpec::Release(release));
        }
        if let Ok(v) = semver::Version::parse(s) {
            return Ok(VersionSpec::Exact(Version::Release(v)));
        }
        if is_snap_hash(s) {
            return Ok(VersionSpec::Exact(Version::Snap(s.to_string())));
        }
        semver::VersionReq::parse(s)
            .map(VersionSpec::Range)
            .map_err(|e| UpdateError::invalid_version_spec(s, e.to_string()))
    }
}

impl TryFrom<String> for VersionSpec {
    type Error = UpdateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionSpec> for String {
    fn from(value: VersionSpec) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Exact(v) => write!(f, "{}", v),
            VersionSpec::Range(req) => write!(f, "{}", req),
            VersionSpec::Release(release) => write!(f, "{}", release),
        }
    }
}
