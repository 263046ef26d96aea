//! Source adapter trait
//!
//! Adapters are the only components doing provider I/O. Their output is
//! untrusted: it goes through the same required-field checks and tolerant
//! deserialization as hand-edited data.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use serde_json::Value;

use crate::kind::Kind;
use crate::merge::KindData;
use crate::model::Record;

/// Errors raised while fetching provider data
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The provider tooling is missing or not configured
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The provider call failed
    #[error("provider call failed: {0}")]
    Command(String),

    /// The provider answered with something we can't interpret
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// The provider call took too long
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Check if the fetch is worth retrying on the next run
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Command(_) | SourceError::Timeout(_))
    }
}

/// Part of the provider a fetch lists
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchScope {
    /// Every resource of the kind
    #[default]
    Global,
    /// Only the resources living in these regions
    Regions(Vec<String>),
}

impl FetchScope {
    /// Check if a stored record falls inside the fetched part of the provider
    ///
    /// Regional fetches only cover records whose `region` was queried.
    #[must_use]
    pub fn covers(&self, record: &Record) -> bool {
        match self {
            FetchScope::Global => true,
            FetchScope::Regions(regions) => record
                .get("region")
                .and_then(Value::as_str)
                .is_some_and(|region| regions.iter().any(|r| r == region)),
        }
    }
}

/// Producer of raw provider records for one kind
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Kind served by the adapter
    fn kind(&self) -> Kind;

    /// Part of the provider `fetch` lists
    fn scope(&self) -> FetchScope {
        FetchScope::Global
    }

    /// Fetch every resource of the kind within [`SourceAdapter::scope`], keyed by id
    ///
    /// The result must be complete for the scope: ids inside it that are
    /// missing from the result are considered gone.
    async fn fetch(&self) -> Result<KindData, SourceError>;
}

/// Adapters available to `regenerate`, one per kind
#[derive(Default, Clone)]
pub struct SourceRegistry {
    adapters: BTreeMap<Kind, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same kind
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    #[must_use]
    pub fn get(&self, kind: Kind) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&kind)
    }

    /// Kinds with a registered adapter, in priority order
    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.adapters.keys().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("kinds", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn located(region: Option<&str>) -> Record {
        let mut record = Record::new();
        if let Some(region) = region {
            record.insert("region".to_string(), json!(region));
        }
        record
    }

    #[test]
    fn test_global_scope_covers_everything() {
        assert!(FetchScope::Global.covers(&located(None)));
        assert!(FetchScope::Global.covers(&located(Some("eu-west-1"))));
    }

    #[test]
    fn test_regional_scope_covers_queried_regions() {
        let scope = FetchScope::Regions(vec!["us-east-1".to_string()]);
        assert!(scope.covers(&located(Some("us-east-1"))));
        assert!(!scope.covers(&located(Some("eu-west-1"))));
        assert!(!scope.covers(&located(None)));
        assert!(!FetchScope::Regions(Vec::new()).covers(&located(Some("us-east-1"))));
    }
}
