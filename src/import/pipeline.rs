//! Ordered import of every entity type followed by the state fix
//!
//! Stages run strictly one after another in registry dependency order, so a
//! stage resolves its links against entities the previous stages created.
//! Per-row failures never stop the pipeline; an unreadable or malformed
//! input file does.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::client::RemoteEntity;
use crate::core::query::{QuerySpec, Where};
use crate::core::registry::{EntityTypeConfig, EntityTypeIds, Registry, RegistryError};
use crate::core::resolver::EntityResolver;
use crate::import::rows::RowsError;
use crate::import::stage::{ImportStage, StageContext, StageResult};
use crate::import::state_fixer::{StateFixResult, StateFixer};

/// Errors that abort the remaining stages
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Rows(#[from] RowsError),
}

/// CSV inputs: one default file plus per-stage overrides
#[derive(Debug, Clone)]
pub struct InputFiles {
    default: PathBuf,
    overrides: HashMap<String, PathBuf>,
}

impl InputFiles {
    pub fn single(path: &Path) -> Self {
        Self {
            default: path.to_path_buf(),
            overrides: HashMap::new(),
        }
    }

    /// Override the file of a stage, keyed by resource or entity name
    pub fn with_override(mut self, stage: &str, path: &Path) -> Self {
        self.overrides.insert(stage.to_string(), path.to_path_buf());
        self
    }

    pub fn for_stage(&self, config: &EntityTypeConfig) -> &Path {
        self.overrides
            .get(&config.resource)
            .or_else(|| self.overrides.get(&config.entity))
            .unwrap_or(&self.default)
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub stages: Vec<StageResult>,
    pub state_fix: Option<StateFixResult>,
}

impl PipelineReport {
    pub fn stage(&self, entity: &str) -> Option<&StageResult> {
        self.stages
            .iter()
            .find(|s| s.entity == entity || s.resource == entity)
    }
}

pub struct ImportPipeline {
    registry: Registry,
    files: InputFiles,
    ctx: StageContext,
}

impl ImportPipeline {
    /// Validate the registry up front so a bad link fails before any request
    pub fn new(
        registry: Registry,
        files: InputFiles,
        ctx: StageContext,
    ) -> Result<Self, RegistryError> {
        registry.validate()?;
        Ok(Self {
            registry,
            files,
            ctx,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();

        for config in self.registry.stage_order()? {
            let stage = ImportStage::new(config, self.files.for_stage(config));
            report.stages.push(stage.run(&self.ctx).await?);
        }

        // Nothing was created in a dry run, so there is nothing to repair
        if let (Some(fix), false) = (&self.registry.state_fix, self.ctx.dry_run) {
            let config = self.registry.get(&fix.entity)?;
            let fixer = StateFixer::new(&self.registry, fix, self.files.for_stage(config))?;
            report.state_fix = Some(fixer.run(&self.ctx).await?);
        }

        Ok(report)
    }
}

fn entity_type_query(name: &str) -> QuerySpec {
    QuerySpec::id_and_name().with_where(Where::Raw(format!("name==\"{}\"", name)))
}

/// Look up the remote ids of the Project and Epic entity types, keeping the
/// given defaults for any that cannot be found
pub async fn discover_type_ids(resolver: &EntityResolver, defaults: EntityTypeIds) -> EntityTypeIds {
    let project_query = entity_type_query("Project");
    let epic_query = entity_type_query("Epic");
    let (project, epic) = tokio::join!(
        resolver.fetch_single(
            "entityType",
            &project_query,
            RemoteEntity::new(defaults.project, "Project"),
        ),
        resolver.fetch_single(
            "entityType",
            &epic_query,
            RemoteEntity::new(defaults.epic, "Epic"),
        )
    );
    tracing::info!(project = project.id, epic = epic.id, "Entity type ids");
    EntityTypeIds {
        project: project.id,
        epic: epic.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_file_overrides() {
        let registry = Registry::targetprocess(EntityTypeIds::default());
        let files = InputFiles::single(Path::new("all.csv"))
            .with_override("epics", Path::new("epics.csv"))
            .with_override("feature", Path::new("features.csv"));

        assert_eq!(
            files.for_stage(registry.get("epic").unwrap()),
            Path::new("epics.csv")
        );
        assert_eq!(
            files.for_stage(registry.get("feature").unwrap()),
            Path::new("features.csv")
        );
        assert_eq!(
            files.for_stage(registry.get("program").unwrap()),
            Path::new("all.csv")
        );
    }

    #[test]
    fn test_entity_type_query() {
        assert_eq!(
            entity_type_query("Epic").to_query_string(),
            "select={id,name}&where=(name==\"Epic\")&take=1000"
        );
    }
}
