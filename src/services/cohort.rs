//! Cohort building.
//!
//! Turns a classification plus tier policy into the ordered list of worker
//! specs that will review the document this round.

use std::sync::Arc;
use tracing::debug;

use crate::domain::models::{Classification, Cohort, Tier};
use crate::services::registry::CapabilityRegistry;

/// Builds cohorts against an immutable capability registry.
#[derive(Debug, Clone)]
pub struct CohortBuilder {
    registry: Arc<CapabilityRegistry>,
}

impl CohortBuilder {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Select the cohort for one round.
    ///
    /// Every core spec is included. Selected specs join when the
    /// classification suggests their capability. Deep specs join only when
    /// `deep_mode` is set and they are suggested. Order follows the
    /// registry, deduplicated by capability on first sight.
    pub fn build(&self, classification: &Classification, deep_mode: bool) -> Cohort {
        let selected = self
            .registry
            .specs()
            .iter()
            .filter(|spec| match spec.tier {
                Tier::Core => true,
                Tier::Selected => classification.suggests(&spec.capability),
                Tier::Deep => deep_mode && classification.suggests(&spec.capability),
            })
            .cloned()
            .collect();

        let cohort = Cohort::from_specs(selected);
        debug!(
            category = %classification.category,
            deep_mode,
            cohort_size = cohort.len(),
            members = ?cohort.capabilities(),
            "Cohort built"
        );
        cohort
    }
}
