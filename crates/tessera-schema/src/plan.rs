use crate::lock::VerifiedLock;
use crate::manifest::Manifest;
use crate::source::SourceRef;
use crate::types::{ContentDigest, PlanId, PlatformId, ShortId};
use semver::Version;
use serde::Serialize;

/// Immutable, content-addressed description of exactly what inputs produce
/// a given artifact: package identity, lock digest, source digest, platform.
///
/// Two plans with identical fields are interchangeable and may share a
/// cached artifact. Building the artifact itself is delegated to an external
/// builder; this type only makes that delegation reproducible.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BuildPlan {
    pub name: String,
    pub version: Version,
    pub lock_digest: ContentDigest,
    pub source_digest: ContentDigest,
    pub platform: PlatformId,
}

impl BuildPlan {
    /// Derive a plan from verified inputs. Pure: identical inputs always
    /// produce a field-identical plan.
    pub fn derive(
        manifest: &Manifest,
        lock: &VerifiedLock,
        source: &SourceRef,
        platform: &PlatformId,
    ) -> Self {
        Self {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            lock_digest: lock.digest(),
            source_digest: source.digest().clone(),
            platform: platform.clone(),
        }
    }

    /// The canonical content address of this plan.
    ///
    /// Hashes every field with domain prefixes; any change to the package
    /// identity, dependency set, sources, or target platform yields a
    /// different id.
    pub fn plan_id(&self) -> PlanId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(format!("pkg:{}@{}", self.name, self.version).as_bytes());
        hasher.update(format!("lock:{}", self.lock_digest).as_bytes());
        hasher.update(format!("src:{}", self.source_digest).as_bytes());
        hasher.update(format!("platform:{}", self.platform).as_bytes());
        PlanId::new(hasher.finalize().to_hex().to_string())
    }

    pub fn short_id(&self) -> ShortId {
        self.plan_id().short()
    }
}
