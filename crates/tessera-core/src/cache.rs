use crate::builder::{Artifact, BuildError, Builder};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tessera_schema::{BuildPlan, PlanId};
use tracing::{debug, info};

/// Content-addressed build cache with per-plan single-flight.
///
/// Keyed by [`BuildPlan::plan_id`], never by object identity: two plans with
/// identical fields share one cached artifact. Concurrent requests for the
/// same plan serialize on a per-key slot, so the underlying builder runs at
/// most once per plan identity. Failures are not cached; a later request
/// runs the builder again.
pub struct BuildCache {
    builder: Arc<dyn Builder>,
    slots: Mutex<HashMap<PlanId, Arc<Mutex<Option<Artifact>>>>>,
}

impl BuildCache {
    pub fn new(builder: Arc<dyn Builder>) -> Self {
        Self {
            builder,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Build the plan's artifact, or return the cached one.
    pub fn build(&self, plan: &BuildPlan) -> Result<Artifact, BuildError> {
        let plan_id = plan.plan_id();

        // The outer map is locked only long enough to fetch or insert the
        // per-key slot; the build itself runs under the slot's own lock.
        let slot = {
            let mut slots = self.slots.lock().map_err(|e| poisoned(&e))?;
            Arc::clone(slots.entry(plan_id.clone()).or_default())
        };

        let mut guard = slot.lock().map_err(|e| poisoned(&e))?;
        if let Some(artifact) = guard.as_ref() {
            debug!("build cache hit for {}", plan_id.short());
            return Ok(artifact.clone());
        }

        info!(
            "building {} ({}@{} for {}) with {} builder",
            plan_id.short(),
            plan.name,
            plan.version,
            plan.platform,
            self.builder.name()
        );
        let artifact = self.builder.build(plan)?;
        *guard = Some(artifact.clone());
        Ok(artifact)
    }
}

fn poisoned<T>(e: &std::sync::PoisonError<T>) -> BuildError {
    BuildError::Internal(format!("mutex poisoned: {e}"))
}
