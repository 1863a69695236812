//! Manifest parsing, lock verification, and build-plan derivation for Tessera.
//!
//! This crate defines the schema layer: TOML manifest parsing (`Manifest`),
//! lock file loading and verification against a manifest (`LockFile`,
//! `VerifiedLock`), deterministic build-plan derivation and content
//! addressing (`BuildPlan`), and source-tree references (`SourceRef`).

pub mod lock;
pub mod manifest;
pub mod plan;
pub mod source;
pub mod types;

pub use lock::{LockEntry, LockError, LockFile, VerifiedLock};
pub use manifest::{parse_manifest_file, parse_manifest_str, Manifest, ManifestError};
pub use plan::BuildPlan;
pub use source::{hash_source_tree, SourceError, SourceRef};
pub use types::{ContentDigest, PlanId, PlatformId, ShortId};
