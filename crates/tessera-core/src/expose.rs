use crate::builder::{Artifact, Builder};
use crate::cache::BuildCache;
use crate::overlay::{ComposedSet, UndefinedPackageError};
use crate::registry::PlatformRegistry;
use crate::EvalError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tessera_schema::PlatformId;
use tracing::{debug, info};

/// Name under which the designated primary package is aliased in every
/// output group.
pub const DEFAULT_OUTPUT: &str = "default";

/// A runnable-program descriptor for a built package.
///
/// `program` points at the executable entry inside the artifact; a launcher
/// appends caller-supplied arguments after `args`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppDescriptor {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl AppDescriptor {
    fn for_artifact(name: &str, artifact: &Artifact) -> Self {
        Self {
            name: name.to_owned(),
            program: format!("{}/bin/{name}", artifact.store_path),
            args: Vec::new(),
        }
    }
}

/// The per-platform outputs of a package set: built `packages`, runnable
/// `apps`, and the designated `default` name. Both maps carry a
/// [`DEFAULT_OUTPUT`] alias.
#[derive(Debug, Clone, Serialize)]
pub struct ExposureEntry {
    pub platform: PlatformId,
    pub packages: BTreeMap<String, Artifact>,
    pub apps: BTreeMap<String, AppDescriptor>,
    pub default: String,
}

type EntrySlot = Arc<Mutex<Option<Arc<ExposureEntry>>>>;

/// Consumer-facing surface: lazily materialized, per-platform outputs.
///
/// For a given (package-set identity, platform) pair the computation runs at
/// most once; repeated calls return the cached entry. Concurrent requesters
/// of the same pair serialize on a per-key slot, and the underlying build
/// cache collapses identical plans, so an artifact is built at most once no
/// matter how many callers ask for it. One platform's failure never poisons
/// another platform's entry.
pub struct ExposureTable {
    registry: PlatformRegistry,
    cache: BuildCache,
    entries: Mutex<HashMap<(u64, PlatformId), EntrySlot>>,
}

impl ExposureTable {
    pub fn new(registry: PlatformRegistry, builder: Arc<dyn Builder>) -> Self {
        Self {
            registry,
            cache: BuildCache::new(builder),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Expose the composed set for one platform, materializing on first
    /// access.
    pub fn expose(
        &self,
        set: &ComposedSet,
        platform: &PlatformId,
    ) -> Result<Arc<ExposureEntry>, EvalError> {
        self.registry.require(platform)?;

        let key = (set.id(), platform.clone());
        let slot = {
            let mut entries = self.entries.lock().map_err(|e| poisoned(&e))?;
            Arc::clone(entries.entry(key).or_default())
        };

        let mut guard = slot.lock().map_err(|e| poisoned(&e))?;
        if let Some(entry) = guard.as_ref() {
            debug!("exposure cache hit for set {} on {platform}", set.id());
            return Ok(Arc::clone(entry));
        }

        let entry = Arc::new(self.materialize(set, platform)?);
        *guard = Some(Arc::clone(&entry));
        Ok(entry)
    }

    /// Expose the set for every registered platform, reporting each
    /// platform's outcome independently.
    pub fn expose_all(
        &self,
        set: &ComposedSet,
    ) -> Vec<(PlatformId, Result<Arc<ExposureEntry>, EvalError>)> {
        self.registry
            .all()
            .iter()
            .map(|platform| (platform.clone(), self.expose(set, platform)))
            .collect()
    }

    fn materialize(
        &self,
        set: &ComposedSet,
        platform: &PlatformId,
    ) -> Result<ExposureEntry, EvalError> {
        info!(
            "materializing set {} for {platform} ({} packages)",
            set.id(),
            set.set().len()
        );

        let default = set
            .set()
            .default_package()
            .ok_or(UndefinedPackageError::NoDefault)?
            .to_owned();
        if !set.set().contains(&default) {
            return Err(UndefinedPackageError::Missing(default).into());
        }

        let mut packages = BTreeMap::new();
        let mut apps = BTreeMap::new();
        for name in set.set().names() {
            let plan = set.plan(name, platform)?;
            let artifact = self.cache.build(&plan)?;
            apps.insert(name.to_owned(), AppDescriptor::for_artifact(name, &artifact));
            packages.insert(name.to_owned(), artifact);
        }

        let primary = packages.get(&default).cloned().ok_or_else(|| {
            EvalError::Internal(format!("default package '{default}' vanished during exposure"))
        })?;
        apps.insert(
            DEFAULT_OUTPUT.to_owned(),
            AppDescriptor::for_artifact(&default, &primary),
        );
        packages.insert(DEFAULT_OUTPUT.to_owned(), primary);

        Ok(ExposureEntry {
            platform: platform.clone(),
            packages,
            apps,
            default,
        })
    }
}

fn poisoned<T>(e: &std::sync::PoisonError<T>) -> EvalError {
    EvalError::Internal(format!("mutex poisoned: {e}"))
}
