//! Document classification.
//!
//! One bounded-excerpt call to the completion backend per document version,
//! parsed into a `Classification`. Any failure along the way, backend error
//! or unparseable response, degrades to the fixed fallback classification
//! instead of reaching the caller.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::models::{Classification, Document, ResourceTier};
use crate::domain::ports::{CompletionRequest, CompletionService};
use crate::services::response::extract_json;
use crate::services::retry::RetryPolicy;

/// Category labels offered to the backend. `generic` doubles as the
/// fallback category, so every classification lands inside this set.
pub const CATEGORY_LABELS: &[&str] = &[
    "technical",
    "academic",
    "business",
    "creative",
    "legal",
    "generic",
];

const CLASSIFY_TEMPERATURE: f64 = 0.0;
const CLASSIFY_MAX_TOKENS: u32 = 512;

/// Classifies documents, caching successful results by content.
pub struct Classifier {
    completion: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    excerpt_chars: usize,
    /// Capability tags the classifier may suggest, taken from the registry
    suggestible: Vec<String>,
    cache: RwLock<HashMap<String, Classification>>,
}

impl Classifier {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        retry: RetryPolicy,
        excerpt_chars: usize,
        suggestible: Vec<String>,
    ) -> Self {
        Self {
            completion,
            retry,
            excerpt_chars,
            suggestible,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Classify a document.
    ///
    /// Identical excerpt and parameter pairs reuse a cached result, so
    /// re-classifying an unchanged document between iterations costs no
    /// backend call. Fallback classifications are never cached.
    pub async fn classify(&self, document: &Document) -> Classification {
        let excerpt = document.excerpt(self.excerpt_chars);
        let key = self.cache_key(excerpt);

        if let Some(hit) = self.cache.read().await.get(&key) {
            debug!(document_id = %document.id, "Classification cache hit");
            return hit.clone();
        }

        let request = CompletionRequest::new(self.build_prompt(excerpt), ResourceTier::Basic)
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = match self
            .retry
            .complete_with_retry(self.completion.as_ref(), request)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    document_id = %document.id,
                    error = %e,
                    "Classification call failed, using fallback classification"
                );
                return Classification::fallback();
            }
        };

        match parse_classification(&response) {
            Some(classification) => {
                debug!(
                    document_id = %document.id,
                    category = %classification.category,
                    complexity = classification.complexity,
                    suggested = classification.suggested_capabilities.len(),
                    "Document classified"
                );
                self.cache.write().await.insert(key, classification.clone());
                classification
            }
            None => {
                warn!(
                    document_id = %document.id,
                    "Classification response unparseable, using fallback classification"
                );
                Classification::fallback()
            }
        }
    }

    /// Content plus parameters, both hashed. Either side changing misses
    /// the cache.
    fn cache_key(&self, excerpt: &str) -> String {
        let text_hash = Sha256::digest(excerpt.as_bytes());

        let mut params = Sha256::new();
        for label in CATEGORY_LABELS {
            params.update(label.as_bytes());
            params.update(b"\n");
        }
        for capability in &self.suggestible {
            params.update(capability.as_bytes());
            params.update(b"\n");
        }
        params.update(ResourceTier::Basic.as_str().as_bytes());
        params.update(CLASSIFY_TEMPERATURE.to_le_bytes());
        let params_hash = params.finalize();

        format!("{text_hash:x}:{params_hash:x}")
    }

    fn build_prompt(&self, excerpt: &str) -> String {
        format!(
            "Classify the document excerpt below.\n\n\
             Respond with ONLY a JSON object, no additional text:\n\
             {{\n  \
               \"category\": \"<one of: {}>\",\n  \
               \"confidence\": <0.0-1.0>,\n  \
               \"complexity\": <0.0-1.0, how demanding the document is to review>,\n  \
               \"suggested_capabilities\": [\"<applicable tags from: {}>\"]\n\
             }}\n\n\
             EXCERPT:\n{}",
            CATEGORY_LABELS.join(", "),
            self.suggestible.join(", "),
            excerpt
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    #[serde(default = "default_midpoint")]
    confidence: f64,
    #[serde(default = "default_midpoint")]
    complexity: f64,
    #[serde(default)]
    suggested_capabilities: Vec<String>,
}

fn default_midpoint() -> f64 {
    0.5
}

/// Parse a classification response. A category outside the label set counts
/// as malformed.
fn parse_classification(response: &str) -> Option<Classification> {
    let raw: RawClassification = serde_json::from_str(extract_json(response)).ok()?;
    let category = raw.category.trim().to_lowercase();
    if !CATEGORY_LABELS.contains(&category.as_str()) {
        return None;
    }
    Some(Classification::new(
        category,
        raw.confidence,
        raw.complexity,
        raw.suggested_capabilities.into_iter().collect::<BTreeSet<_>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::domain::ports::CompletionError;

    struct CountingCompletion {
        calls: AtomicU32,
        response: Result<String, fn() -> CompletionError>,
    }

    #[async_trait]
    impl CompletionService for CountingCompletion {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn classifier(service: Arc<CountingCompletion>) -> Classifier {
        let retry = RetryPolicy::new(0, Duration::from_millis(1), Duration::from_millis(1))
            .with_call_timeout(Duration::from_secs(5));
        Classifier::new(
            service,
            retry,
            4000,
            vec!["terminology".to_string(), "currency".to_string()],
        )
    }

    #[test]
    fn test_parse_valid_classification() {
        let response = r#"{
            "category": "Technical",
            "confidence": 0.92,
            "complexity": 0.7,
            "suggested_capabilities": ["terminology", "currency"]
        }"#;
        let parsed = parse_classification(response).unwrap();
        assert_eq!(parsed.category, "technical");
        assert!((parsed.complexity - 0.7).abs() < f64::EPSILON);
        assert!(parsed.suggests("currency"));
    }

    #[test]
    fn test_parse_rejects_unknown_category() {
        assert!(parse_classification(r#"{"category": "poetry"}"#).is_none());
        assert!(parse_classification("not json").is_none());
    }

    #[test]
    fn test_parse_defaults_missing_scores() {
        let parsed = parse_classification(r#"{"category": "legal"}"#).unwrap();
        assert!((parsed.confidence - 0.5).abs() < f64::EPSILON);
        assert!((parsed.complexity - 0.5).abs() < f64::EPSILON);
        assert!(parsed.suggested_capabilities.is_empty());
    }

    #[tokio::test]
    async fn test_identical_documents_hit_the_cache() {
        let service = Arc::new(CountingCompletion {
            calls: AtomicU32::new(0),
            response: Ok(r#"{"category": "technical", "complexity": 0.6}"#.to_string()),
        });
        let classifier = classifier(service.clone());
        let document = Document::new("same text");

        let first = classifier.classify(&document).await;
        let second = classifier.classify(&document).await;

        assert_eq!(first, second);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_without_caching() {
        let service = Arc::new(CountingCompletion {
            calls: AtomicU32::new(0),
            response: Err(|| CompletionError::AuthenticationFailed),
        });
        let classifier = classifier(service.clone());
        let document = Document::new("text");

        let first = classifier.classify(&document).await;
        assert_eq!(first, Classification::fallback());

        // Fallbacks are not cached, so the backend is consulted again
        classifier.classify(&document).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unparseable_response_falls_back() {
        let service = Arc::new(CountingCompletion {
            calls: AtomicU32::new(0),
            response: Ok("I cannot classify this.".to_string()),
        });
        let classifier = classifier(service);
        let result = classifier.classify(&Document::new("text")).await;
        assert_eq!(result, Classification::fallback());
    }
}
