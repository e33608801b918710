//! External AI context collaborator seam.
//!
//! Node creation asks the collaborator for descriptive fields exactly
//! once, through a narrow provider interface with a hard timeout and a
//! guaranteed fallback (empty context). The pipeline never blocks on the
//! network and never fails because of it.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::CollaboratorConfig;
use crate::error::CollaboratorError;
use crate::types::Category;

/// Descriptive fields for a newly created entity, keyed by field name.
/// Missing fields are normal; templates render them empty.
pub type EntityContext = BTreeMap<String, String>;

/// One context lookup: who we're asking about and the meeting excerpt
/// that mentioned them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRequest {
    pub entity_name: String,
    pub category: Category,
    pub excerpt: String,
}

/// The descriptive field set requested per category.
pub fn field_set(category: Category) -> &'static [&'static str] {
    match category {
        Category::Person => &[
            "role",
            "company",
            "email",
            "relationship",
            "department",
            "notes",
        ],
        Category::Company => &[
            "industry",
            "size",
            "location",
            "relationship",
            "business_needs",
            "notes",
        ],
        Category::Technology => &["category", "status", "usage", "business_value", "notes"],
        Category::Task => &["priority", "due", "status", "notes"],
        Category::Meeting => &[],
    }
}

/// Supplies descriptive fields for new entities. Implementations must
/// tolerate being asked about entities they know nothing about.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn lookup(&self, request: &ContextRequest) -> Result<EntityContext, CollaboratorError>;
}

/// Provider that always returns an empty context. The fallback when no
/// endpoint is configured, and the fixture for tests.
pub struct NullContextProvider;

#[async_trait]
impl ContextProvider for NullContextProvider {
    async fn lookup(&self, _request: &ContextRequest) -> Result<EntityContext, CollaboratorError> {
        Ok(EntityContext::new())
    }
}

/// HTTP JSON provider: POSTs the request to the configured endpoint and
/// reads back a flat `{field: text}` object. Non-string and unexpected
/// fields are ignored; partial responses are fine.
pub struct HttpContextProvider {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpContextProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Failed(e.to_string()))?;
        Ok(HttpContextProvider {
            client,
            endpoint: endpoint.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Build from config; None when no endpoint is configured.
    pub fn from_config(config: &CollaboratorConfig) -> Result<Option<Self>, CollaboratorError> {
        match &config.endpoint {
            Some(endpoint) => {
                Self::new(endpoint, Duration::from_secs(config.timeout_secs)).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ContextProvider for HttpContextProvider {
    async fn lookup(&self, request: &ContextRequest) -> Result<EntityContext, CollaboratorError> {
        let payload = serde_json::json!({
            "entityName": request.entity_name,
            "category": request.category,
            "excerpt": request.excerpt,
            "fields": field_set(request.category),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout(self.timeout_secs)
                } else {
                    CollaboratorError::Failed(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| CollaboratorError::Failed(e.to_string()))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;

        let mut context = EntityContext::new();
        if let Some(map) = value.as_object() {
            for (key, field) in map {
                if let Some(text) = field.as_str() {
                    context.insert(key.clone(), text.to_string());
                }
            }
        }
        Ok(context)
    }
}

/// Run a lookup under a hard wall-clock budget. Expiry is a
/// `CollaboratorError::Timeout`, which callers absorb with the
/// empty-context fallback.
pub async fn lookup_with_timeout(
    provider: &dyn ContextProvider,
    request: &ContextRequest,
    timeout: Duration,
) -> Result<EntityContext, CollaboratorError> {
    match tokio::time::timeout(timeout, provider.lookup(request)).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(timeout.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProvider;

    #[async_trait]
    impl ContextProvider for SlowProvider {
        async fn lookup(
            &self,
            _request: &ContextRequest,
        ) -> Result<EntityContext, CollaboratorError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(EntityContext::new())
        }
    }

    fn request() -> ContextRequest {
        ContextRequest {
            entity_name: "Acme Corp".to_string(),
            category: Category::Company,
            excerpt: "Acme wants a Q2 rollout".to_string(),
        }
    }

    #[tokio::test]
    async fn test_null_provider_returns_empty_context() {
        let context = NullContextProvider.lookup(&request()).await.unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_enforced() {
        let result =
            lookup_with_timeout(&SlowProvider, &request(), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(CollaboratorError::Timeout(5))));
    }

    #[test]
    fn test_field_sets_cover_graph_categories() {
        for category in Category::GRAPH {
            assert!(!field_set(category).is_empty());
        }
        assert!(field_set(Category::Meeting).is_empty());
    }

    #[test]
    fn test_from_config_without_endpoint() {
        let provider = HttpContextProvider::from_config(&CollaboratorConfig::default()).unwrap();
        assert!(provider.is_none());
    }
}
