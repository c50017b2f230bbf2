//! Worker specification and cohort models.
//!
//! A `WorkerSpec` is a static, registry-defined description of one review
//! capability. A `Cohort` is the ordered, deduplicated selection of specs
//! chosen for a single round.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Priority class of a worker capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Always included in every cohort
    Core,
    /// Included when the classification suggests the capability
    Selected,
    /// Included only in deep mode, and only when suggested
    Deep,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Selected => "selected",
            Self::Deep => "deep",
        }
    }

    /// Numeric tier level (1-3).
    pub fn level(&self) -> u8 {
        match self {
            Self::Core => 1,
            Self::Selected => 2,
            Self::Deep => 3,
        }
    }

    /// Tier from its numeric level.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Core),
            2 => Some(Self::Selected),
            3 => Some(Self::Deep),
            _ => None,
        }
    }
}

/// How a worker's call is dispatched to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    /// Single completion call
    Standard,
    /// Completion call that may request sandboxed verification
    ToolAugmented,
    /// Web search before the completion call
    SearchAugmented,
    /// Academic search before the completion call
    AcademicAugmented,
}

impl DispatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ToolAugmented => "tool_augmented",
            Self::SearchAugmented => "search_augmented",
            Self::AcademicAugmented => "academic_augmented",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "tool_augmented" => Some(Self::ToolAugmented),
            "search_augmented" => Some(Self::SearchAugmented),
            "academic_augmented" => Some(Self::AcademicAugmented),
            _ => None,
        }
    }
}

impl Default for DispatchKind {
    fn default() -> Self {
        Self::Standard
    }
}

/// Backend configuration class selected for a worker's calls.
///
/// Metadata only: it picks which backend model a call uses and has no
/// bearing on local concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTier {
    Basic,
    Standard,
    Powerful,
}

impl ResourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Powerful => "powerful",
        }
    }

    /// Select a tier from document complexity and worker weight.
    ///
    /// `score = 0.4 * complexity + 0.6 * weight`; 0.8 and above maps to
    /// powerful, 0.6 and above to standard, anything lower to basic.
    pub fn select(complexity: f64, complexity_weight: f64) -> Self {
        let score = 0.4 * complexity + 0.6 * complexity_weight;
        if score >= 0.8 {
            Self::Powerful
        } else if score >= 0.6 {
            Self::Standard
        } else {
            Self::Basic
        }
    }
}

impl Default for ResourceTier {
    fn default() -> Self {
        Self::Basic
    }
}

/// Static description of one review capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Capability tag, unique within a registry
    pub capability: String,
    /// Priority class
    pub tier: Tier,
    /// Intrinsic difficulty of this capability, in [0, 1]
    pub complexity_weight: f64,
    /// Dispatch strategy for this worker's calls
    pub dispatch: DispatchKind,
    /// One-line statement of what this reviewer examines
    pub focus: String,
}

impl WorkerSpec {
    pub fn new(
        capability: impl Into<String>,
        tier: Tier,
        complexity_weight: f64,
        dispatch: DispatchKind,
    ) -> Self {
        Self {
            capability: capability.into(),
            tier,
            complexity_weight: complexity_weight.clamp(0.0, 1.0),
            dispatch,
            focus: String::new(),
        }
    }

    /// Set the reviewer focus line.
    #[must_use]
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = focus.into();
        self
    }

    /// Resource tier for this worker given the document's complexity.
    pub fn resource_tier(&self, complexity: f64) -> ResourceTier {
        ResourceTier::select(complexity, self.complexity_weight)
    }
}

/// Ordered, capability-deduplicated worker selection for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    members: Vec<WorkerSpec>,
}

impl Cohort {
    /// Build a cohort from specs, keeping the first occurrence of each
    /// capability and the incoming order.
    pub fn from_specs(specs: Vec<WorkerSpec>) -> Self {
        let mut seen = HashSet::new();
        let members = specs
            .into_iter()
            .filter(|spec| seen.insert(spec.capability.clone()))
            .collect();
        Self { members }
    }

    pub fn members(&self) -> &[WorkerSpec] {
        &self.members
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkerSpec> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkerSpec> {
        self.members.get(index)
    }

    /// Capability tags in cohort order.
    pub fn capabilities(&self) -> Vec<&str> {
        self.members.iter().map(|s| s.capability.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a Cohort {
    type Item = &'a WorkerSpec;
    type IntoIter = std::slice::Iter<'a, WorkerSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_levels() {
        assert_eq!(Tier::Core.level(), 1);
        assert_eq!(Tier::Deep.level(), 3);
        assert_eq!(Tier::from_level(2), Some(Tier::Selected));
        assert_eq!(Tier::from_level(4), None);
    }

    #[test]
    fn test_dispatch_kind_round_trip() {
        for kind in [
            DispatchKind::Standard,
            DispatchKind::ToolAugmented,
            DispatchKind::SearchAugmented,
            DispatchKind::AcademicAugmented,
        ] {
            assert_eq!(DispatchKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(DispatchKind::from_str("other"), None);
    }

    #[test]
    fn test_resource_tier_thresholds() {
        // 0.4 * 0.5 + 0.6 * 1.0 = 0.8, boundary maps up
        assert_eq!(ResourceTier::select(0.5, 1.0), ResourceTier::Powerful);
        // 0.4 * 0.0 + 0.6 * 1.0 = 0.6
        assert_eq!(ResourceTier::select(0.0, 1.0), ResourceTier::Standard);
        // 0.4 * 0.5 + 0.6 * 0.3 = 0.38
        assert_eq!(ResourceTier::select(0.5, 0.3), ResourceTier::Basic);
        assert_eq!(ResourceTier::select(1.0, 1.0), ResourceTier::Powerful);
    }

    #[test]
    fn test_cohort_dedup_keeps_first_seen() {
        let cohort = Cohort::from_specs(vec![
            WorkerSpec::new("clarity", Tier::Core, 0.3, DispatchKind::Standard),
            WorkerSpec::new("accuracy", Tier::Core, 0.6, DispatchKind::Standard),
            WorkerSpec::new("clarity", Tier::Selected, 0.9, DispatchKind::ToolAugmented),
        ]);
        assert_eq!(cohort.len(), 2);
        assert_eq!(cohort.capabilities(), vec!["clarity", "accuracy"]);
        assert_eq!(cohort.members()[0].tier, Tier::Core);
    }

    #[test]
    fn test_spec_resource_tier_uses_weight() {
        let spec = WorkerSpec::new("methodology", Tier::Deep, 0.9, DispatchKind::Standard);
        assert_eq!(spec.resource_tier(0.9), ResourceTier::Powerful);
        let light = WorkerSpec::new("readability", Tier::Selected, 0.2, DispatchKind::Standard);
        assert_eq!(light.resource_tier(0.2), ResourceTier::Basic);
    }
}
