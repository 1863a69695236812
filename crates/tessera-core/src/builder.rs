use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tessera_schema::{BuildPlan, PlanId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build failed for plan {plan}: {message}")]
    Failed { plan: PlanId, message: String },
    #[error("builder internal error: {0}")]
    Internal(String),
}

/// A built artifact: the plan that produced it and where it landed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Artifact {
    pub plan_id: PlanId,
    pub store_path: String,
}

/// The sole artifact-producing collaborator.
///
/// Implementations are treated as deterministic and idempotent for a given
/// plan: the same plan must yield the same artifact. Retry policy, if any,
/// lives behind this seam; callers never retry.
pub trait Builder: Send + Sync {
    fn name(&self) -> &str;

    fn build(&self, plan: &BuildPlan) -> Result<Artifact, BuildError>;
}

/// Deterministic in-memory builder for tests and dry runs.
///
/// Store paths are derived from the plan id, so identical plans map to
/// identical artifacts. Counts invocations so callers can assert on the
/// at-most-one-build guarantee.
pub struct MockBuilder {
    builds: AtomicUsize,
    fail_packages: BTreeSet<String>,
}

impl Default for MockBuilder {
    fn default() -> Self {
        Self {
            builds: AtomicUsize::new(0),
            fail_packages: BTreeSet::new(),
        }
    }
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that fails every plan for the named packages.
    pub fn failing_for(packages: impl IntoIterator<Item = String>) -> Self {
        Self {
            builds: AtomicUsize::new(0),
            fail_packages: packages.into_iter().collect(),
        }
    }

    /// Number of times `build` has run, including failed runs.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl Builder for MockBuilder {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn build(&self, plan: &BuildPlan) -> Result<Artifact, BuildError> {
        self.builds.fetch_add(1, Ordering::SeqCst);

        let plan_id = plan.plan_id();
        if self.fail_packages.contains(&plan.name) {
            return Err(BuildError::Failed {
                plan: plan_id,
                message: format!("mock failure for package '{}'", plan.name),
            });
        }

        Ok(Artifact {
            store_path: format!(
                "/tessera/store/{}-{}-{}",
                plan_id.short(),
                plan.name,
                plan.version
            ),
            plan_id,
        })
    }
}
