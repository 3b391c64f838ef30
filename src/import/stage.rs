//! One entity type's import cycle: resolve, parse, map, deduplicate, submit
//!
//! Reference resolution and CSV parsing run concurrently; mapping starts once
//! both are done. Submissions are issued concurrently and the stage settles
//! when every one of them has succeeded or failed. Individual failures are
//! reported as outcomes, never as errors.

use futures::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::client::RemoteApi;
use crate::core::diagnostics::{DiagnosticKind, Diagnostics};
use crate::core::registry::EntityTypeConfig;
use crate::core::resolver::EntityResolver;
use crate::import::mapper::{map_row, MappedRow, UnresolvedLink};
use crate::import::progress::Progress;
use crate::import::rows::{read_rows, RowsError};

/// What happened to one row
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Created with every populated link resolved
    Submitted { line: usize, name: String },
    /// Created, but some populated links were left unset
    LinkUnresolved {
        line: usize,
        name: String,
        missing: Vec<UnresolvedLink>,
    },
    /// The create call failed
    SubmitFailed {
        line: usize,
        name: String,
        error: String,
    },
    /// The display-name column was blank
    SkippedNoName { line: usize },
    /// Collapsed into an earlier row with the same name
    Duplicate { line: usize, name: String },
    /// Dry run: would have been submitted with this body
    Planned {
        line: usize,
        name: String,
        payload: Value,
    },
}

impl Outcome {
    pub fn line(&self) -> usize {
        match self {
            Outcome::Submitted { line, .. }
            | Outcome::LinkUnresolved { line, .. }
            | Outcome::SubmitFailed { line, .. }
            | Outcome::SkippedNoName { line }
            | Outcome::Duplicate { line, .. }
            | Outcome::Planned { line, .. } => *line,
        }
    }

    /// Whether the remote create call succeeded
    pub fn is_created(&self) -> bool {
        matches!(
            self,
            Outcome::Submitted { .. } | Outcome::LinkUnresolved { .. }
        )
    }
}

/// Settled outcomes of one stage, ordered by source line
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub entity: String,
    pub resource: String,
    pub outcomes: Vec<Outcome>,
}

impl StageResult {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    pub fn created(&self) -> usize {
        self.count(Outcome::is_created)
    }

    pub fn unresolved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::LinkUnresolved { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SubmitFailed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SkippedNoName { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Duplicate { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Planned { .. }))
    }

    /// Number of create calls issued
    pub fn submissions(&self) -> usize {
        self.created() + self.failed()
    }
}

/// Collaborators shared by every stage of a run
#[derive(Clone)]
pub struct StageContext {
    pub api: Arc<dyn RemoteApi>,
    pub resolver: EntityResolver,
    pub diagnostics: Arc<Diagnostics>,
    pub progress: Arc<dyn Progress>,
    pub dry_run: bool,
}

impl StageContext {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        diagnostics: Arc<Diagnostics>,
        progress: Arc<dyn Progress>,
    ) -> Self {
        Self {
            resolver: EntityResolver::new(api.clone(), diagnostics.clone()),
            api,
            diagnostics,
            progress,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Import of a single entity type from one CSV file
pub struct ImportStage<'a> {
    config: &'a EntityTypeConfig,
    file: PathBuf,
}

impl<'a> ImportStage<'a> {
    pub fn new(config: &'a EntityTypeConfig, file: &Path) -> Self {
        Self {
            config,
            file: file.to_path_buf(),
        }
    }

    pub fn config(&self) -> &EntityTypeConfig {
        self.config
    }

    /// Run the stage to settlement. Only an unreadable or malformed input
    /// file is an error.
    pub async fn run(&self, ctx: &StageContext) -> Result<StageResult, RowsError> {
        let config = self.config;
        tracing::info!(entity = %config.entity, file = %self.file.display(), "Starting stage");

        let (resolved, rows) = tokio::join!(
            ctx.resolver.resolve_links(&config.linked),
            read_rows(&self.file)
        );
        let rows = rows?;

        let mut outcomes = Vec::with_capacity(rows.len());
        let mut mapped: Vec<MappedRow> = Vec::with_capacity(rows.len());
        for row in &rows {
            match map_row(config, row, &resolved, &ctx.diagnostics) {
                Some(m) => mapped.push(m),
                None => outcomes.push(Outcome::SkippedNoName { line: row.line }),
            }
        }

        let to_submit = if config.unique_by_name {
            let mut seen = HashSet::new();
            let mut unique = Vec::with_capacity(mapped.len());
            for m in mapped {
                if seen.insert(m.payload.name.clone()) {
                    unique.push(m);
                } else {
                    outcomes.push(Outcome::Duplicate {
                        line: m.line,
                        name: m.payload.name,
                    });
                }
            }
            unique
        } else {
            mapped
        };

        if ctx.dry_run {
            outcomes.extend(to_submit.into_iter().map(|m| Outcome::Planned {
                line: m.line,
                payload: m.payload.to_json(),
                name: m.payload.name,
            }));
        } else {
            ctx.progress.start(&config.resource, to_submit.len());
            let settled = join_all(to_submit.into_iter().map(|m| self.submit(ctx, m))).await;
            ctx.progress.finish();
            outcomes.extend(settled);
        }

        outcomes.sort_by_key(Outcome::line);
        let result = StageResult {
            entity: config.entity.clone(),
            resource: config.resource.clone(),
            outcomes,
        };
        tracing::info!(
            entity = %result.entity,
            created = result.created(),
            failed = result.failed(),
            skipped = result.skipped(),
            duplicates = result.duplicates(),
            "Stage settled"
        );
        Ok(result)
    }

    async fn submit(&self, ctx: &StageContext, mapped: MappedRow) -> Outcome {
        let resource = &self.config.resource;
        let body = mapped.payload.to_json();
        let outcome = match ctx.api.submit(resource, &body).await {
            Ok(()) if mapped.unresolved.is_empty() => Outcome::Submitted {
                line: mapped.line,
                name: mapped.payload.name,
            },
            Ok(()) => Outcome::LinkUnresolved {
                line: mapped.line,
                name: mapped.payload.name,
                missing: mapped.unresolved,
            },
            Err(e) => {
                ctx.diagnostics.record(
                    DiagnosticKind::SubmitFailed,
                    resource,
                    format!("Fail to save {}: {}, error: {}", resource, body, e),
                );
                Outcome::SubmitFailed {
                    line: mapped.line,
                    name: mapped.payload.name,
                    error: e.to_string(),
                }
            }
        };
        ctx.progress.tick();
        outcome
    }
}
