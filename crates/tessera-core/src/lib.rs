//! Evaluation and composition engine for Tessera.
//!
//! This crate ties the schema layer into the consumer-facing surface: the
//! platform registry (canonical target identifiers), overlay composition
//! (copy-on-extend package sets with lazy self-reference), the build cache
//! (content-addressed, single-flight), and the exposure table (per-platform
//! memoized `packages` / `apps` / `default` outputs).

pub mod builder;
pub mod cache;
pub mod expose;
pub mod overlay;
pub mod registry;

pub use builder::{Artifact, BuildError, Builder, MockBuilder};
pub use cache::BuildCache;
pub use expose::{AppDescriptor, ExposureEntry, ExposureTable, DEFAULT_OUTPUT};
pub use overlay::{
    compose, ComposedSet, FinalSet, Overlay, PackageSet, Recipe, UndefinedPackageError,
};
pub use registry::{PlatformRegistry, UnknownPlatformError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("manifest error: {0}")]
    Manifest(#[from] tessera_schema::ManifestError),
    #[error("lock error: {0}")]
    Lock(#[from] tessera_schema::LockError),
    #[error(transparent)]
    UnknownPlatform(#[from] UnknownPlatformError),
    #[error(transparent)]
    UndefinedPackage(#[from] UndefinedPackageError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("internal error: {0}")]
    Internal(String),
}
