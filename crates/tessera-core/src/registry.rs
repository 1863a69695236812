use serde::Serialize;
use tessera_schema::PlatformId;
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error("unknown platform '{platform}'")]
pub struct UnknownPlatformError {
    pub platform: PlatformId,
}

/// Ordered canonical set of target platforms.
///
/// The registry is the single source of truth for which platforms exist; no
/// other component invents platform identifiers. It is passed explicitly to
/// whatever needs it (tests can supply a reduced set) rather than living in
/// a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRegistry {
    platforms: Vec<PlatformId>,
}

/// The versionable list of platforms a stock installation knows about.
const BUILTIN_PLATFORMS: &[&str] = &[
    "x86_64-linux",
    "aarch64-linux",
    "x86_64-darwin",
    "aarch64-darwin",
];

impl PlatformRegistry {
    /// Registry over the built-in platform list.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_PLATFORMS.iter().map(|p| PlatformId::from(*p)))
    }

    /// Registry over an explicit platform list. Order is preserved;
    /// duplicates are dropped.
    pub fn new(platforms: impl IntoIterator<Item = PlatformId>) -> Self {
        let mut seen = Vec::new();
        for platform in platforms {
            if !seen.contains(&platform) {
                seen.push(platform);
            }
        }
        Self { platforms: seen }
    }

    pub fn all(&self) -> &[PlatformId] {
        &self.platforms
    }

    pub fn contains(&self, platform: &PlatformId) -> bool {
        self.platforms.contains(platform)
    }

    pub fn require(&self, platform: &PlatformId) -> Result<(), UnknownPlatformError> {
        if self.contains(platform) {
            Ok(())
        } else {
            Err(UnknownPlatformError {
                platform: platform.clone(),
            })
        }
    }
}
