//! Classification domain model.
//!
//! Produced once per iteration by the classifier and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category assigned when the backend response is unusable.
pub const FALLBACK_CATEGORY: &str = "generic";

/// Complexity assigned when the backend response is unusable.
pub const FALLBACK_COMPLEXITY: f64 = 0.5;

/// Capability tags suggested when classification falls back.
///
/// These select the generic tier-2 reviewers that make sense for any
/// document regardless of category.
pub fn fallback_capabilities() -> BTreeSet<String> {
    ["terminology", "readability"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// The classifier's verdict on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Document category label
    pub category: String,
    /// Backend's confidence in the category, in [0, 1]
    pub confidence: f64,
    /// Estimated document complexity, in [0, 1]
    pub complexity: f64,
    /// Capability tags the classifier suggests for this document
    pub suggested_capabilities: BTreeSet<String>,
}

impl Classification {
    /// Create a classification with clamped numeric fields.
    pub fn new(
        category: impl Into<String>,
        confidence: f64,
        complexity: f64,
        suggested_capabilities: BTreeSet<String>,
    ) -> Self {
        Self {
            category: category.into(),
            confidence: confidence.clamp(0.0, 1.0),
            complexity: complexity.clamp(0.0, 1.0),
            suggested_capabilities,
        }
    }

    /// The fixed fallback classification used when the backend fails.
    pub fn fallback() -> Self {
        Self {
            category: FALLBACK_CATEGORY.to_string(),
            confidence: 0.0,
            complexity: FALLBACK_COMPLEXITY,
            suggested_capabilities: fallback_capabilities(),
        }
    }

    /// Whether a capability tag was suggested.
    pub fn suggests(&self, capability: &str) -> bool {
        self.suggested_capabilities.contains(capability)
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::fallback()
    }
}
