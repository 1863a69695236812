use crate::EvalError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tessera_schema::{BuildPlan, Manifest, PlatformId, SourceRef, VerifiedLock};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UndefinedPackageError {
    #[error("package '{0}' is not defined by the base set or any overlay")]
    Missing(String),
    #[error("package set designates no default package")]
    NoDefault,
}

/// A deferred package definition: given a target platform and the final
/// composed set, produce a build plan. Recipes run only when an output is
/// demanded, never during composition.
pub type Recipe = Arc<dyn Fn(&PlatformId, &FinalSet) -> Result<BuildPlan, EvalError> + Send + Sync>;

/// An overlay extends or overrides entries in a package set.
///
/// `fin` is a lazy handle onto the eventual fully-composed set; `prev` is
/// the set produced by all overlays strictly before this one (or the base).
/// The returned set holds only the new/overridden entries. Referencing `fin`
/// inside a returned recipe is how an overlay sees sibling definitions that
/// later overlays may still override.
pub type Overlay = Box<dyn Fn(&FinalSet, &PackageSet) -> PackageSet + Send + Sync>;

/// Mapping from package name to recipe, plus a designated default package.
///
/// Copy-on-extend: composition produces new sets and never mutates a prior
/// one in place.
#[derive(Clone, Default)]
pub struct PackageSet {
    entries: BTreeMap<String, Recipe>,
    default_package: Option<String>,
}

impl fmt::Debug for PackageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageSet")
            .field("packages", &self.entries.keys().collect::<Vec<_>>())
            .field("default_package", &self.default_package)
            .finish()
    }
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base set for a single package from verified inputs: one entry named
    /// after the manifest, designated as the default.
    pub fn for_package(manifest: Manifest, lock: VerifiedLock, source: SourceRef) -> Self {
        let name = manifest.name.clone();
        let inputs = Arc::new((manifest, lock, source));
        let recipe: Recipe = Arc::new(move |platform, _| {
            let (manifest, lock, source) = inputs.as_ref();
            Ok(BuildPlan::derive(manifest, lock, source, platform))
        });
        Self::new().with(name.clone(), recipe).with_default(name)
    }

    pub fn with(mut self, name: impl Into<String>, recipe: Recipe) -> Self {
        self.entries.insert(name.into(), recipe);
        self
    }

    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_package = Some(name.into());
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_package(&self) -> Option<&str> {
        self.default_package.as_deref()
    }

    /// A new set with `partial`'s entries shadowing this set's for the same
    /// name. A default designated by `partial` wins.
    fn extended_with(&self, partial: &PackageSet) -> PackageSet {
        let mut entries = self.entries.clone();
        for (name, recipe) in &partial.entries {
            entries.insert(name.clone(), Arc::clone(recipe));
        }
        PackageSet {
            entries,
            default_package: partial
                .default_package
                .clone()
                .or_else(|| self.default_package.clone()),
        }
    }

    fn recipe(&self, name: &str) -> Result<&Recipe, UndefinedPackageError> {
        self.entries
            .get(name)
            .ok_or_else(|| UndefinedPackageError::Missing(name.to_owned()))
    }
}

/// Lazy handle onto the fully-composed package set.
///
/// During composition the handle is unsealed; overlays may capture it inside
/// recipes but nothing can be forced through it yet. `compose` seals it once
/// the whole chain has been applied, after which forcing a name resolves
/// against the final set — so a recipe referencing a sibling sees that
/// sibling's last override, not the definition current when the recipe was
/// written.
#[derive(Clone)]
pub struct FinalSet {
    sealed: Arc<OnceLock<PackageSet>>,
}

impl FinalSet {
    fn unsealed() -> Self {
        Self {
            sealed: Arc::new(OnceLock::new()),
        }
    }

    fn get(&self) -> Result<&PackageSet, EvalError> {
        self.sealed.get().ok_or_else(|| {
            EvalError::Internal("final package set forced before composition sealed it".to_owned())
        })
    }

    /// Force the named package's plan for a platform against the final set.
    pub fn plan(&self, name: &str, platform: &PlatformId) -> Result<BuildPlan, EvalError> {
        let set = self.get()?;
        let recipe = set.recipe(name)?;
        recipe(platform, self)
    }
}

static NEXT_SET_ID: AtomicU64 = AtomicU64::new(0);

/// The result of applying an overlay chain to a base set.
///
/// Carries a process-unique identity used by the exposure table's
/// memoization key.
#[derive(Clone)]
pub struct ComposedSet {
    id: u64,
    set: PackageSet,
    final_set: FinalSet,
}

impl fmt::Debug for ComposedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedSet")
            .field("id", &self.id)
            .field("set", &self.set)
            .finish()
    }
}

impl ComposedSet {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set(&self) -> &PackageSet {
        &self.set
    }

    pub fn final_set(&self) -> &FinalSet {
        &self.final_set
    }

    pub fn plan(&self, name: &str, platform: &PlatformId) -> Result<BuildPlan, EvalError> {
        self.final_set.plan(name, platform)
    }
}

/// Apply an overlay chain to a base set, left to right.
///
/// Each overlay sees the accumulated set so far as `prev` and the sealed
/// final set (lazily) as `fin`; later overlays shadow earlier entries for
/// the same name. Composition itself forces nothing, which is what keeps
/// self-referential chains well-defined.
pub fn compose(base: PackageSet, overlays: Vec<Overlay>) -> ComposedSet {
    let final_set = FinalSet::unsealed();

    let mut acc = base;
    for overlay in overlays {
        let partial = overlay(&final_set, &acc);
        acc = acc.extended_with(&partial);
    }

    // The handle was created above and is sealed exactly once here.
    let _ = final_set.sealed.set(acc.clone());

    ComposedSet {
        id: NEXT_SET_ID.fetch_add(1, Ordering::Relaxed),
        set: acc,
        final_set,
    }
}
