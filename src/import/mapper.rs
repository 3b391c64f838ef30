//! Row-to-entity mapping
//!
//! A row becomes a payload `{name, <linkedType>: {id}, customFields: [...]}`.
//! Only a missing name drops the row; unresolved links and blank custom
//! fields are left out of the payload.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::diagnostics::{DiagnosticKind, Diagnostics};
use crate::core::registry::EntityTypeConfig;
use crate::core::resolver::ResolvedEntitySet;
use crate::import::rows::Row;

/// A custom field value copied from the row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomFieldValue {
    pub name: String,
    pub value: String,
}

/// Candidate entity built from one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPayload {
    pub name: String,
    /// `(target type, remote id)` of every resolved link, in config order
    pub links: Vec<(String, i64)>,
    pub custom_fields: Vec<CustomFieldValue>,
}

impl EntityPayload {
    pub fn link(&self, target_type: &str) -> Option<i64> {
        self.links
            .iter()
            .find(|(t, _)| t == target_type)
            .map(|(_, id)| *id)
    }

    /// JSON body for the create endpoint
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("name".to_string(), Value::String(self.name.clone()));
        for (target_type, id) in &self.links {
            body.insert(target_type.clone(), json!({ "id": id }));
        }
        body.insert("customFields".to_string(), json!(self.custom_fields));
        Value::Object(body)
    }
}

/// A link whose value named no fetched entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLink {
    pub target_type: String,
    pub value: String,
}

/// Result of mapping a row that has a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRow {
    pub line: usize,
    pub payload: EntityPayload,
    pub unresolved: Vec<UnresolvedLink>,
}

/// Map one row; `None` when the display-name column is blank
pub fn map_row(
    config: &EntityTypeConfig,
    row: &Row,
    resolved: &ResolvedEntitySet,
    diagnostics: &Diagnostics,
) -> Option<MappedRow> {
    let name = row.value(&config.name_column)?.trim().to_string();

    let mut links = Vec::new();
    let mut unresolved = Vec::new();
    for link in &config.linked {
        let Some(value) = row.value(&link.column) else {
            continue;
        };
        match resolved.find(&link.target_type, value) {
            Some(entity) => links.push((link.target_type.clone(), entity.id)),
            None => {
                diagnostics.record(
                    DiagnosticKind::ReferenceUnresolved,
                    &config.entity,
                    format!(
                        "Could not find '{}' {} to set for '{}' (row {})",
                        value, link.target_type, name, row.line
                    ),
                );
                unresolved.push(UnresolvedLink {
                    target_type: link.target_type.clone(),
                    value: value.to_string(),
                });
            }
        }
    }

    let custom_fields = config
        .custom_fields
        .iter()
        .filter_map(|cf| {
            row.value(&cf.column).map(|value| CustomFieldValue {
                name: cf.name.clone(),
                value: value.to_string(),
            })
        })
        .collect();

    Some(MappedRow {
        line: row.line,
        payload: EntityPayload {
            name,
            links,
            custom_fields,
        },
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::RemoteEntity;
    use crate::core::registry::{EntityTypeIds, Registry};

    fn registry() -> Registry {
        Registry::targetprocess(EntityTypeIds::default())
    }

    #[test]
    fn test_blank_name_skips_row() {
        let registry = registry();
        let config = registry.get("program").unwrap();
        let row = Row::from_pairs(2, [("Program", "  ")]);
        let diagnostics = Diagnostics::new();
        assert!(map_row(config, &row, &ResolvedEntitySet::new(), &diagnostics).is_none());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_empty_link_column_leaves_link_unset() {
        let registry = registry();
        let config = registry.get("project").unwrap();
        let row = Row::from_pairs(2, [("Program", ""), ("Product", "Alpha")]);
        let diagnostics = Diagnostics::new();

        let mapped = map_row(config, &row, &ResolvedEntitySet::new(), &diagnostics).unwrap();
        assert_eq!(
            mapped.payload.to_json(),
            json!({ "name": "Alpha", "customFields": [] })
        );
        assert!(mapped.unresolved.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_resolved_link_attached() {
        let registry = registry();
        let config = registry.get("project").unwrap();
        let mut resolved = ResolvedEntitySet::new();
        resolved.insert("program", vec![RemoteEntity::new(11, "Games")]);
        let row = Row::from_pairs(2, [("Program", " Games "), ("Product", "Alpha")]);

        let mapped = map_row(config, &row, &resolved, &Diagnostics::new()).unwrap();
        assert_eq!(mapped.payload.link("program"), Some(11));
        assert_eq!(mapped.payload.to_json()["program"], json!({ "id": 11 }));
    }

    #[test]
    fn test_unresolved_link_logged_and_omitted() {
        let registry = registry();
        let config = registry.get("project").unwrap();
        let mut resolved = ResolvedEntitySet::new();
        resolved.insert("program", vec![RemoteEntity::new(11, "Games")]);
        let row = Row::from_pairs(4, [("Program", "games"), ("Product", "Alpha")]);
        let diagnostics = Diagnostics::new();

        let mapped = map_row(config, &row, &resolved, &diagnostics).unwrap();
        assert!(mapped.payload.to_json().get("program").is_none());
        assert_eq!(
            mapped.unresolved,
            vec![UnresolvedLink {
                target_type: "program".to_string(),
                value: "games".to_string()
            }]
        );
        assert_eq!(diagnostics.count(DiagnosticKind::ReferenceUnresolved), 1);
    }

    #[test]
    fn test_only_filled_custom_fields() {
        let registry = registry();
        let config = registry.get("feature").unwrap();
        let row = Row::from_pairs(
            2,
            [
                ("Project Area / Activity", "Level design"),
                ("Development Studio", "North"),
                ("Department", ""),
                ("Sub Department", "Maps"),
            ],
        );

        let mapped = map_row(config, &row, &ResolvedEntitySet::new(), &Diagnostics::new()).unwrap();
        assert_eq!(
            mapped.payload.custom_fields,
            vec![
                CustomFieldValue {
                    name: "Development Studio".to_string(),
                    value: "North".to_string()
                },
                CustomFieldValue {
                    name: "Sub - Department".to_string(),
                    value: "Maps".to_string()
                },
            ]
        );
    }
}
