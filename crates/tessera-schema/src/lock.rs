use crate::manifest::Manifest;
use crate::types::ContentDigest;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to read lock file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse lock file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unsupported lock_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("no lock entry for declared dependency '{name}'")]
    MissingEntry { name: String },
    #[error("duplicate lock entry for '{name}'")]
    DuplicateEntry { name: String },
    #[error("empty checksum for lock entry '{name}'")]
    EmptyChecksum { name: String },
    #[error(
        "lock drift for '{name}': locked version {locked} no longer satisfies \
         requirement '{requirement}'"
    )]
    VersionDrift {
        name: String,
        locked: Version,
        requirement: String,
    },
}

/// A single pinned dependency: name, resolved version, content checksum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct LockEntry {
    pub name: String,
    pub version: Version,
    pub checksum: String,
}

/// On-disk lock file (`tessera.lock`), as written by an external resolver.
///
/// Entries may appear in any order and may include transitive dependencies
/// not named by the manifest. Verification, not resolution, happens here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockFile {
    pub lock_version: u32,
    #[serde(default, rename = "package")]
    pub entries: Vec<LockEntry>,
}

impl LockFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(input: &str) -> Result<Self, LockError> {
        let lock: LockFile = toml::from_str(input)?;
        if lock.lock_version != 1 {
            return Err(LockError::UnsupportedVersion(lock.lock_version));
        }
        Ok(lock)
    }

    /// Verify this lock against a manifest's declared dependencies.
    ///
    /// Checks, in order: duplicate entry names, empty checksums, coverage of
    /// every declared dependency, and requirement drift (a locked version
    /// that no longer satisfies the manifest). Nothing is ever resolved or
    /// repaired here; a failed check is fatal for the whole verification.
    pub fn verify(&self, manifest: &Manifest) -> Result<VerifiedLock, LockError> {
        let mut seen = BTreeSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(LockError::DuplicateEntry {
                    name: entry.name.clone(),
                });
            }
            if entry.checksum.trim().is_empty() {
                return Err(LockError::EmptyChecksum {
                    name: entry.name.clone(),
                });
            }
        }

        for (name, requirement) in &manifest.dependencies {
            let entry = self
                .entries
                .iter()
                .find(|e| e.name == *name)
                .ok_or_else(|| LockError::MissingEntry { name: name.clone() })?;
            if !requirement.matches(&entry.version) {
                return Err(LockError::VersionDrift {
                    name: name.clone(),
                    locked: entry.version.clone(),
                    requirement: requirement.to_string(),
                });
            }
        }

        // Sorted by name so the digest is independent of on-disk order.
        let mut entries = self.entries.clone();
        entries.sort();

        Ok(VerifiedLock { entries })
    }
}

/// An immutable, name-sorted lock that passed verification against a
/// manifest. The only way to obtain one is [`LockFile::verify`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VerifiedLock {
    entries: Vec<LockEntry>,
}

impl VerifiedLock {
    pub fn entries(&self) -> &[LockEntry] {
        &self.entries
    }

    /// Deterministic digest over the sorted entry sequence.
    ///
    /// Hashes `(name, version, checksum)` per entry with domain prefixes,
    /// so incidental formatting differences in the lock file never change
    /// the digest.
    pub fn digest(&self) -> ContentDigest {
        let mut hasher = blake3::Hasher::new();
        for entry in &self.entries {
            hasher.update(
                format!("dep:{}@{}:{}", entry.name, entry.version, entry.checksum).as_bytes(),
            );
        }
        ContentDigest::new(hasher.finalize().to_hex().to_string())
    }
}
