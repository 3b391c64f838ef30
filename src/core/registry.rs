//! Entity-type registry
//!
//! Declarative description of every entity type the importer creates: which
//! CSV column holds the display name, which columns reference other entities
//! (and how those entities are queried), and which columns become custom
//! fields. The stage order is derived from the `linked` relationships.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::core::query::{FieldCondition, QuerySpec, Where};

/// Errors raised while validating or loading a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("'{entity}' links to '{target}', which is neither imported nor declared external")]
    UnknownTarget { entity: String, target: String },

    #[error("'{entity}' links to '{target}' more than once")]
    DuplicateTarget { entity: String, target: String },

    #[error("entity type '{0}' is declared more than once")]
    DuplicateEntity(String),

    #[error("dependency cycle between entity types: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("unknown entity type: '{0}'")]
    UnknownStage(String),

    #[error("state fix for '{entity}' needs a '{state_type}' link")]
    MissingStateLink { entity: String, state_type: String },

    #[error("failed to read registry file {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid registry file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Column copied into a named custom field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldSpec {
    pub name: String,
    pub column: String,
}

impl CustomFieldSpec {
    pub fn new(name: &str, column: &str) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
        }
    }
}

/// Reference from a row to an already existing remote entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedRef {
    /// Remote entity type queried and used as the payload key (e.g. `program`)
    pub target_type: String,
    /// Column holding the referenced entity's name
    pub column: String,
    #[serde(default = "QuerySpec::id_and_name")]
    pub query: QuerySpec,
}

impl LinkedRef {
    pub fn new(target_type: &str, column: &str, query: QuerySpec) -> Self {
        Self {
            target_type: target_type.to_string(),
            column: column.to_string(),
            query,
        }
    }
}

/// Import configuration of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeConfig {
    /// Name other entity types link to and the v2 query resource (`epic`)
    pub entity: String,
    /// v1 resource entities are created under (`epics`)
    pub resource: String,
    pub name_column: String,
    #[serde(default)]
    pub unique_by_name: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked: Vec<LinkedRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomFieldSpec>,
}

impl EntityTypeConfig {
    /// The link whose target is `target_type`, if any
    pub fn link_to(&self, target_type: &str) -> Option<&LinkedRef> {
        self.linked.iter().find(|l| l.target_type == target_type)
    }

    /// Every CSV column this entity type reads, in first-use order
    pub fn columns(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        std::iter::once(self.name_column.as_str())
            .chain(self.linked.iter().map(|l| l.column.as_str()))
            .chain(self.custom_fields.iter().map(|c| c.column.as_str()))
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

/// Corrective pass re-applying a workflow state after later stages ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFixConfig {
    /// Entity type whose state is repaired
    pub entity: String,
    /// Link (by target type) that carries the desired state
    #[serde(default = "default_state_type")]
    pub state_type: String,
    /// State the remote system falls back to; rows asking for it are skipped
    #[serde(default = "default_state_name")]
    pub default_state: String,
}

fn default_state_type() -> String {
    "entityState".to_string()
}

fn default_state_name() -> String {
    "Active".to_string()
}

/// Remote ids of entity types whose workflow states are queried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTypeIds {
    pub project: i64,
    pub epic: i64,
}

impl Default for EntityTypeIds {
    fn default() -> Self {
        Self {
            project: 1,
            epic: 27,
        }
    }
}

/// Registry of all entity types taking part in an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Types that already exist remotely and are only ever queried
    #[serde(default)]
    pub external: Vec<String>,
    pub entity_types: Vec<EntityTypeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_fix: Option<StateFixConfig>,
}

/// Default-process workflow states of one entity type
pub fn states_query(entity_type_id: i64) -> QuerySpec {
    QuerySpec::id_and_name().with_where(Where::Fields(vec![
        FieldCondition::equals("process.isDefault", true),
        FieldCondition::equals("entityType.id", entity_type_id),
    ]))
}

impl Registry {
    /// The built-in Targetprocess registry
    pub fn targetprocess(ids: EntityTypeIds) -> Self {
        let by_name = QuerySpec::id_and_name;

        let program = EntityTypeConfig {
            entity: "program".to_string(),
            resource: "programs".to_string(),
            name_column: "Program".to_string(),
            unique_by_name: true,
            linked: vec![],
            custom_fields: vec![],
        };

        let project = EntityTypeConfig {
            entity: "project".to_string(),
            resource: "projects".to_string(),
            name_column: "Product".to_string(),
            unique_by_name: true,
            linked: vec![
                LinkedRef::new("program", "Program", by_name()),
                LinkedRef::new("entityState", "Product State", states_query(ids.project)),
            ],
            custom_fields: vec![CustomFieldSpec::new("Product Type", "Product Type")],
        };

        let epic = EntityTypeConfig {
            entity: "epic".to_string(),
            resource: "epics".to_string(),
            name_column: "Project / Operations".to_string(),
            unique_by_name: true,
            linked: vec![
                LinkedRef::new("project", "Product / Program", by_name()),
                LinkedRef::new("entityState", "Project State", states_query(ids.epic)),
            ],
            custom_fields: [
                "Published under Brand",
                "Department Code",
                "Investment Type",
                "Management Type",
                "Development Studio",
                "Project State",
                "Registration Date",
                "Budget Owner",
            ]
            .iter()
            .map(|c| CustomFieldSpec::new(c, c))
            .collect(),
        };

        let feature = EntityTypeConfig {
            entity: "feature".to_string(),
            resource: "features".to_string(),
            name_column: "Project Area / Activity".to_string(),
            unique_by_name: false,
            linked: vec![
                LinkedRef::new("project", "Product / Program", by_name()),
                LinkedRef::new("epic", "Project / Operations", by_name()),
            ],
            custom_fields: vec![
                CustomFieldSpec::new("Development Studio", "Development Studio"),
                CustomFieldSpec::new("Department", "Department"),
                CustomFieldSpec::new("Sub - Department", "Sub Department"),
            ],
        };

        Self {
            external: vec!["entityState".to_string()],
            entity_types: vec![program, project, epic, feature],
            state_fix: Some(StateFixConfig {
                entity: "epic".to_string(),
                state_type: default_state_type(),
                default_state: default_state_name(),
            }),
        }
    }

    /// Load a registry from a YAML file
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|e| RegistryError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_yml::from_str(&contents).map_err(|e| RegistryError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Look up an entity type by its `entity` or `resource` name
    pub fn get(&self, name: &str) -> Result<&EntityTypeConfig, RegistryError> {
        self.entity_types
            .iter()
            .find(|c| c.entity == name || c.resource == name)
            .ok_or_else(|| RegistryError::UnknownStage(name.to_string()))
    }

    /// Entity types in dependency order: every type comes after all the
    /// types it links to. Ties keep declaration order.
    pub fn stage_order(&self) -> Result<Vec<&EntityTypeConfig>, RegistryError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, config) in self.entity_types.iter().enumerate() {
            if index.insert(config.entity.as_str(), i).is_some() {
                return Err(RegistryError::DuplicateEntity(config.entity.clone()));
            }
        }
        let external: HashSet<&str> = self.external.iter().map(String::as_str).collect();

        // deps[i] = imported types entity i waits for
        let mut deps: Vec<HashSet<usize>> = Vec::with_capacity(self.entity_types.len());
        for config in &self.entity_types {
            let mut targets = HashSet::new();
            let mut waits = HashSet::new();
            for link in &config.linked {
                if !targets.insert(link.target_type.as_str()) {
                    return Err(RegistryError::DuplicateTarget {
                        entity: config.entity.clone(),
                        target: link.target_type.clone(),
                    });
                }
                match index.get(link.target_type.as_str()) {
                    Some(&dep) => {
                        waits.insert(dep);
                    }
                    None if external.contains(link.target_type.as_str()) => {}
                    None => {
                        return Err(RegistryError::UnknownTarget {
                            entity: config.entity.clone(),
                            target: link.target_type.clone(),
                        })
                    }
                }
            }
            deps.push(waits);
        }

        let mut placed = vec![false; self.entity_types.len()];
        let mut order = Vec::with_capacity(self.entity_types.len());
        while order.len() < self.entity_types.len() {
            let next = (0..self.entity_types.len())
                .find(|&i| !placed[i] && deps[i].iter().all(|&d| placed[d]));
            match next {
                Some(i) => {
                    placed[i] = true;
                    order.push(&self.entity_types[i]);
                }
                None => {
                    let remaining = (0..self.entity_types.len())
                        .filter(|&i| !placed[i])
                        .map(|i| self.entity_types[i].entity.clone())
                        .collect();
                    return Err(RegistryError::Cycle(remaining));
                }
            }
        }
        Ok(order)
    }

    /// Validate the whole registry, failing fast before any request is made
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.stage_order()?;
        if let Some(fix) = &self.state_fix {
            let config = self.get(&fix.entity)?;
            if config.link_to(&fix.state_type).is_none() {
                return Err(RegistryError::MissingStateLink {
                    entity: fix.entity.clone(),
                    state_type: fix.state_type.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, links: &[&str]) -> EntityTypeConfig {
        EntityTypeConfig {
            entity: name.to_string(),
            resource: format!("{}s", name),
            name_column: "Name".to_string(),
            unique_by_name: false,
            linked: links
                .iter()
                .map(|t| LinkedRef::new(t, t, QuerySpec::id_and_name()))
                .collect(),
            custom_fields: vec![],
        }
    }

    fn registry(types: Vec<EntityTypeConfig>) -> Registry {
        Registry {
            external: vec!["entityState".to_string()],
            entity_types: types,
            state_fix: None,
        }
    }

    #[test]
    fn test_builtin_order() {
        let registry = Registry::targetprocess(EntityTypeIds::default());
        let order: Vec<_> = registry
            .stage_order()
            .unwrap()
            .iter()
            .map(|c| c.entity.as_str())
            .collect();
        assert_eq!(order, vec!["program", "project", "epic", "feature"]);
        registry.validate().unwrap();
    }

    #[test]
    fn test_order_follows_links_not_declaration() {
        let registry = registry(vec![
            entity("feature", &["epic"]),
            entity("epic", &["project"]),
            entity("project", &["entityState"]),
        ]);
        let order: Vec<_> = registry
            .stage_order()
            .unwrap()
            .iter()
            .map(|c| c.entity.as_str())
            .collect();
        assert_eq!(order, vec!["project", "epic", "feature"]);
    }

    #[test]
    fn test_unknown_target_fails() {
        let registry = registry(vec![entity("epic", &["portfolio"])]);
        assert!(matches!(
            registry.stage_order(),
            Err(RegistryError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_cycle_fails() {
        let registry = registry(vec![entity("a", &["b"]), entity("b", &["a"])]);
        match registry.stage_order() {
            Err(RegistryError::Cycle(names)) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_target_fails() {
        let registry = registry(vec![entity("a", &["entityState", "entityState"])]);
        assert!(matches!(
            registry.stage_order(),
            Err(RegistryError::DuplicateTarget { .. })
        ));
    }

    #[test]
    fn test_state_fix_requires_state_link() {
        let mut registry = registry(vec![entity("epic", &[])]);
        registry.state_fix = Some(StateFixConfig {
            entity: "epic".to_string(),
            state_type: default_state_type(),
            default_state: default_state_name(),
        });
        assert!(matches!(
            registry.validate(),
            Err(RegistryError::MissingStateLink { .. })
        ));
    }

    #[test]
    fn test_states_query_uses_type_id() {
        assert_eq!(
            states_query(27).to_query_string(),
            "select={id,name}&where=(process.isDefault=true and entityType.id=27)&take=1000"
        );
    }

    #[test]
    fn test_columns_deduplicated() {
        let registry = Registry::targetprocess(EntityTypeIds::default());
        let epic = registry.get("epics").unwrap();
        let columns = epic.columns();
        assert_eq!(columns[0], "Project / Operations");
        assert_eq!(
            columns.iter().filter(|c| **c == "Project State").count(),
            1
        );
    }

    #[test]
    fn test_yaml_roundtrip_of_builtin() {
        let registry = Registry::targetprocess(EntityTypeIds::default());
        let yaml = serde_yml::to_string(&registry).unwrap();
        let parsed: Registry = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, registry);
    }
}
