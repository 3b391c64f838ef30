//! Corrective pass re-applying epic workflow states
//!
//! Creating features under an epic makes Targetprocess reopen the epic. Once
//! every stage has settled, the epics whose row asks for a state other than
//! the default one get that state applied again with one update each.

use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::diagnostics::DiagnosticKind;
use crate::core::query::QuerySpec;
use crate::core::registry::{EntityTypeConfig, LinkedRef, Registry, RegistryError, StateFixConfig};
use crate::core::resolver::ResolvedEntitySet;
use crate::import::rows::{read_rows, RowsError};
use crate::import::stage::StageContext;

/// What happened to one row during the corrective pass
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// Update sent and accepted
    Updated {
        line: usize,
        id: i64,
        state: String,
    },
    /// Update sent and rejected
    Failed {
        line: usize,
        id: i64,
        error: String,
    },
    /// Entity or state name not found remotely
    Unresolved { line: usize, name: String },
    /// No state, the default state, or an entity already handled
    Skipped { line: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateFixResult {
    pub outcomes: Vec<FixOutcome>,
}

impl StateFixResult {
    pub fn updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FixOutcome::Updated { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FixOutcome::Failed { .. }))
            .count()
    }

    pub fn unresolved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FixOutcome::Unresolved { .. }))
            .count()
    }
}

/// A corrective update waiting to be sent
#[derive(Debug, Clone, PartialEq)]
struct PendingUpdate {
    line: usize,
    id: i64,
    state: String,
    body: Value,
}

pub struct StateFixer<'a> {
    fix: &'a StateFixConfig,
    config: &'a EntityTypeConfig,
    state_link: &'a LinkedRef,
    file: PathBuf,
}

impl<'a> StateFixer<'a> {
    pub fn new(
        registry: &'a Registry,
        fix: &'a StateFixConfig,
        file: &Path,
    ) -> Result<Self, RegistryError> {
        let config = registry.get(&fix.entity)?;
        let state_link =
            config
                .link_to(&fix.state_type)
                .ok_or_else(|| RegistryError::MissingStateLink {
                    entity: fix.entity.clone(),
                    state_type: fix.state_type.clone(),
                })?;
        Ok(Self {
            fix,
            config,
            state_link,
            file: file.to_path_buf(),
        })
    }

    pub async fn run(&self, ctx: &StageContext) -> Result<StateFixResult, RowsError> {
        let state_link = self.state_link;
        tracing::info!(entity = %self.config.entity, "Re-applying workflow states");

        let all = QuerySpec::id_and_name();
        let (entities, states, rows) = tokio::join!(
            ctx.resolver.fetch(&self.config.entity, &all),
            ctx.resolver.fetch(&state_link.target_type, &state_link.query),
            read_rows(&self.file)
        );
        let rows = rows?;

        let mut resolved = ResolvedEntitySet::new();
        resolved.insert(&self.config.entity, entities);
        resolved.insert(&state_link.target_type, states);

        let mut outcomes = Vec::new();
        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for row in &rows {
            let (Some(name), Some(desired)) = (
                row.value(&self.config.name_column),
                row.value(&state_link.column),
            ) else {
                outcomes.push(FixOutcome::Skipped { line: row.line });
                continue;
            };

            // Asking for the default state is a no-op, even if states are unavailable
            if desired.trim() == self.fix.default_state {
                outcomes.push(FixOutcome::Skipped { line: row.line });
                continue;
            }

            let Some(state) = resolved.find(&state_link.target_type, desired) else {
                ctx.diagnostics.record(
                    DiagnosticKind::StateUnresolved,
                    &self.config.entity,
                    format!(
                        "Could not find state '{}' for {} '{}' (row {})",
                        desired, self.config.entity, name, row.line
                    ),
                );
                outcomes.push(FixOutcome::Unresolved {
                    line: row.line,
                    name: name.to_string(),
                });
                continue;
            };

            if state.name == self.fix.default_state {
                outcomes.push(FixOutcome::Skipped { line: row.line });
                continue;
            }

            let Some(entity) = resolved.find(&self.config.entity, name) else {
                ctx.diagnostics.record(
                    DiagnosticKind::StateUnresolved,
                    &self.config.entity,
                    format!(
                        "Could not find {} '{}' to set state '{}' (row {})",
                        self.config.entity, name, state.name, row.line
                    ),
                );
                outcomes.push(FixOutcome::Unresolved {
                    line: row.line,
                    name: name.to_string(),
                });
                continue;
            };

            if !seen.insert(entity.id) {
                outcomes.push(FixOutcome::Skipped { line: row.line });
                continue;
            }

            let mut body = json!({ "id": entity.id });
            body[state_link.target_type.as_str()] = json!({ "id": state.id });
            pending.push(PendingUpdate {
                line: row.line,
                id: entity.id,
                state: state.name.clone(),
                body,
            });
        }

        let label = format!("{} states", self.config.resource);
        ctx.progress.start(&label, pending.len());
        let settled = join_all(pending.into_iter().map(|p| self.apply(ctx, p))).await;
        ctx.progress.finish();
        outcomes.extend(settled);

        outcomes.sort_by_key(|o| match o {
            FixOutcome::Updated { line, .. }
            | FixOutcome::Failed { line, .. }
            | FixOutcome::Unresolved { line, .. }
            | FixOutcome::Skipped { line } => *line,
        });
        let result = StateFixResult { outcomes };
        tracing::info!(
            entity = %self.config.entity,
            updated = result.updated(),
            failed = result.failed(),
            unresolved = result.unresolved(),
            "State fix settled"
        );
        Ok(result)
    }

    async fn apply(&self, ctx: &StageContext, update: PendingUpdate) -> FixOutcome {
        let resource = &self.config.resource;
        let outcome = match ctx.api.submit(resource, &update.body).await {
            Ok(()) => FixOutcome::Updated {
                line: update.line,
                id: update.id,
                state: update.state,
            },
            Err(e) => {
                ctx.diagnostics.record(
                    DiagnosticKind::SubmitFailed,
                    resource,
                    format!("Fail to save {}: {}, error: {}", resource, update.body, e),
                );
                FixOutcome::Failed {
                    line: update.line,
                    id: update.id,
                    error: e.to_string(),
                }
            }
        };
        ctx.progress.tick();
        outcome
    }
}
