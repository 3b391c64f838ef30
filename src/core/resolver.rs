//! Entity resolution against the remote system
//!
//! The resolver turns queries into entity lists, degrading every failure to
//! an empty list plus a recorded diagnostic. A [`ResolvedEntitySet`] is built
//! once per stage and only read afterwards.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::client::{RemoteApi, RemoteEntity};
use crate::core::diagnostics::{DiagnosticKind, Diagnostics};
use crate::core::query::QuerySpec;
use crate::core::registry::LinkedRef;

/// Remote entities fetched for a stage, bucketed by target type
#[derive(Debug, Clone, Default)]
pub struct ResolvedEntitySet {
    buckets: HashMap<String, Vec<RemoteEntity>>,
}

impl ResolvedEntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target_type: &str, entities: Vec<RemoteEntity>) {
        self.buckets.insert(target_type.to_string(), entities);
    }

    /// Entities fetched for `target_type` (empty when nothing was fetched)
    pub fn bucket(&self, target_type: &str) -> &[RemoteEntity] {
        self.buckets
            .get(target_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First entity of `target_type` named exactly `name` once trimmed.
    ///
    /// Matching is case-sensitive.
    pub fn find(&self, target_type: &str, name: &str) -> Option<&RemoteEntity> {
        let wanted = name.trim();
        self.bucket(target_type).iter().find(|e| e.name == wanted)
    }
}

/// Fetches remote entities on behalf of the pipeline
#[derive(Clone)]
pub struct EntityResolver {
    api: Arc<dyn RemoteApi>,
    diagnostics: Arc<Diagnostics>,
}

impl EntityResolver {
    pub fn new(api: Arc<dyn RemoteApi>, diagnostics: Arc<Diagnostics>) -> Self {
        Self { api, diagnostics }
    }

    /// All entities of `entity_type` matching `query`; empty on failure
    pub async fn fetch(&self, entity_type: &str, query: &QuerySpec) -> Vec<RemoteEntity> {
        match self.api.fetch(entity_type, query).await {
            Ok(entities) => {
                tracing::debug!(
                    entity_type = %entity_type,
                    count = entities.len(),
                    "Fetched entities"
                );
                entities
            }
            Err(e) => {
                self.diagnostics.record(
                    DiagnosticKind::FetchFailed,
                    entity_type,
                    format!(
                        "Fail to get {} entities with query '{}', error: {}",
                        entity_type, query, e
                    ),
                );
                Vec::new()
            }
        }
    }

    /// First entity matching `query`, or `default` when there is none
    pub async fn fetch_single(
        &self,
        entity_type: &str,
        query: &QuerySpec,
        default: RemoteEntity,
    ) -> RemoteEntity {
        let single = query.clone().with_take(1);
        self.fetch(entity_type, &single)
            .await
            .into_iter()
            .next()
            .unwrap_or(default)
    }

    /// Fetch every link target concurrently and wait for all of them.
    ///
    /// Links sharing a target type and query are fetched once.
    pub async fn resolve_links(&self, links: &[LinkedRef]) -> ResolvedEntitySet {
        let mut unique: Vec<(&str, &QuerySpec)> = Vec::new();
        for link in links {
            let key = (link.target_type.as_str(), &link.query);
            if !unique.contains(&key) {
                unique.push(key);
            }
        }

        let fetched = join_all(
            unique
                .iter()
                .map(|(target_type, query)| self.fetch(target_type, query)),
        )
        .await;

        let mut resolved = ResolvedEntitySet::new();
        for ((target_type, _), entities) in unique.into_iter().zip(fetched) {
            resolved.insert(target_type, entities);
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_trims_lookup_value() {
        let mut set = ResolvedEntitySet::new();
        set.insert(
            "program",
            vec![RemoteEntity::new(1, "Alpha"), RemoteEntity::new(2, "Beta")],
        );
        assert_eq!(set.find("program", "  Beta ").map(|e| e.id), Some(2));
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let mut set = ResolvedEntitySet::new();
        set.insert("program", vec![RemoteEntity::new(1, "Alpha")]);
        assert!(set.find("program", "alpha").is_none());
    }

    #[test]
    fn test_missing_bucket_is_empty() {
        let set = ResolvedEntitySet::new();
        assert!(set.bucket("epic").is_empty());
        assert!(set.find("epic", "Anything").is_none());
    }
}
