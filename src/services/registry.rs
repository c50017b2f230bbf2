//! Capability registry.
//!
//! An explicit immutable registry value constructed at startup and passed
//! by reference into cohort building. No ambient module state, so tests can
//! use isolated registries.

use crate::domain::models::{DispatchKind, Tier, WorkerSpec};

/// Immutable collection of worker specifications, unique by capability.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    specs: Vec<WorkerSpec>,
}

impl CapabilityRegistry {
    /// Build a registry from specs, keeping the first occurrence of each
    /// capability and the insertion order.
    pub fn new(specs: Vec<WorkerSpec>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let specs = specs
            .into_iter()
            .filter(|spec| seen.insert(spec.capability.clone()))
            .collect();
        Self { specs }
    }

    /// The default document-review registry.
    ///
    /// Core reviewers run on every document; selected reviewers join when
    /// classification suggests them; deep reviewers additionally require
    /// deep mode.
    pub fn standard() -> Self {
        Self::new(vec![
            WorkerSpec::new("clarity", Tier::Core, 0.3, DispatchKind::Standard)
                .with_focus("plain, unambiguous prose and consistent voice"),
            WorkerSpec::new("structure", Tier::Core, 0.4, DispatchKind::Standard)
                .with_focus("section ordering, flow, and signposting"),
            WorkerSpec::new("accuracy", Tier::Core, 0.6, DispatchKind::Standard)
                .with_focus("internal consistency and factual soundness of claims"),
            WorkerSpec::new("terminology", Tier::Selected, 0.5, DispatchKind::Standard)
                .with_focus("precise, consistent domain vocabulary"),
            WorkerSpec::new("readability", Tier::Selected, 0.4, DispatchKind::Standard)
                .with_focus("sentence length, density, and audience fit"),
            WorkerSpec::new("technical_depth", Tier::Selected, 0.8, DispatchKind::ToolAugmented)
                .with_focus("correctness of technical detail, verifiable by code"),
            WorkerSpec::new("currency", Tier::Selected, 0.6, DispatchKind::SearchAugmented)
                .with_focus("whether time-sensitive claims are still current"),
            WorkerSpec::new("citations", Tier::Selected, 0.7, DispatchKind::AcademicAugmented)
                .with_focus("support and attribution for cited material"),
            WorkerSpec::new("methodology", Tier::Deep, 0.9, DispatchKind::AcademicAugmented)
                .with_focus("soundness of methods and stated assumptions"),
            WorkerSpec::new("reproducibility", Tier::Deep, 0.9, DispatchKind::ToolAugmented)
                .with_focus("whether described procedures can be reproduced"),
            WorkerSpec::new("prior_art", Tier::Deep, 0.8, DispatchKind::SearchAugmented)
                .with_focus("relation to existing published work"),
        ])
    }

    pub fn specs(&self) -> &[WorkerSpec] {
        &self.specs
    }

    /// Specs in a given tier, in registry order.
    pub fn tier(&self, tier: Tier) -> impl Iterator<Item = &WorkerSpec> {
        self.specs.iter().filter(move |spec| spec.tier == tier)
    }

    /// Lookup by capability tag.
    pub fn get(&self, capability: &str) -> Option<&WorkerSpec> {
        self.specs.iter().find(|spec| spec.capability == capability)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
