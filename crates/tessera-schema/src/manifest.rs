use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("package.name must not be empty")]
    EmptyName,
    #[error("invalid package.version '{value}': {source}")]
    InvalidVersion {
        value: String,
        source: semver::Error,
    },
    #[error("invalid requirement '{requirement}' for dependency '{name}': {source}")]
    InvalidRequirement {
        name: String,
        requirement: String,
        source: semver::Error,
    },
    #[error("dependency name must not be empty")]
    EmptyDependencyName,
}

/// On-disk manifest shape (`tessera.toml`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ManifestToml {
    package: PackageSection,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct PackageSection {
    name: String,
    version: String,
}

/// A validated package manifest: identity plus declared dependency
/// requirements. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub version: Version,
    pub dependencies: BTreeMap<String, VersionReq>,
}

impl Manifest {
    /// `name@version`, the identity under which plans are derived.
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    let raw: ManifestToml = toml::from_str(input)?;

    let name = raw.package.name.trim().to_owned();
    if name.is_empty() {
        return Err(ManifestError::EmptyName);
    }

    let version =
        Version::parse(raw.package.version.trim()).map_err(|source| {
            ManifestError::InvalidVersion {
                value: raw.package.version.clone(),
                source,
            }
        })?;

    let mut dependencies = BTreeMap::new();
    for (dep_name, requirement) in &raw.dependencies {
        let dep_name = dep_name.trim();
        if dep_name.is_empty() {
            return Err(ManifestError::EmptyDependencyName);
        }
        let req = VersionReq::parse(requirement.trim()).map_err(|source| {
            ManifestError::InvalidRequirement {
                name: dep_name.to_owned(),
                requirement: requirement.clone(),
                source,
            }
        })?;
        dependencies.insert(dep_name.to_owned(), req);
    }

    Ok(Manifest {
        name,
        version,
        dependencies,
    })
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}
