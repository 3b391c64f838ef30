//! Query specifications and their rendering to the Targetprocess v2 query syntax
//!
//! A [`QuerySpec`] is a declarative description of which fields to select,
//! which entities to keep and how many to take. [`QuerySpec::to_query_string`]
//! renders it as `select={..}&where=(..)&take=N`; the client appends the token.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of items requested when a query does not say otherwise
pub const DEFAULT_TAKE: u32 = 1000;

/// Literal value compared with `=` in a where clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

/// Condition applied to one field of a where clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Plain equality, rendered `field=value`
    Equals(Literal),
    /// Explicit comparator expression, rendered `field <expr>` (e.g. `is null`)
    Is(String),
}

/// A single `field` + condition entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub field: String,
    #[serde(flatten)]
    pub condition: Condition,
}

impl FieldCondition {
    pub fn equals(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Equals(value.into()),
        }
    }

    pub fn is(field: impl Into<String>, comparator: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Is(comparator.into()),
        }
    }
}

impl fmt::Display for FieldCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Condition::Equals(value) => write!(f, "{}={}", self.field, value),
            Condition::Is(expr) => write!(f, "{} {}", self.field, expr),
        }
    }
}

/// The `where` part of a query: either a raw expression or field conditions
/// joined with `and`, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Where {
    Raw(String),
    Fields(Vec<FieldCondition>),
}

impl Where {
    /// Render the expression placed inside `where=(...)`.
    ///
    /// No escaping is performed; values are expected to be simple tokens.
    pub fn render(&self) -> String {
        match self {
            Where::Raw(expr) => expr.clone(),
            Where::Fields(fields) => fields
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(" and "),
        }
    }
}

/// Declarative description of a remote query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub select: Vec<String>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Where>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
}

impl QuerySpec {
    /// `select={id,name}` with no filter
    pub fn id_and_name() -> Self {
        Self {
            select: vec!["id".to_string(), "name".to_string()],
            ..Self::default()
        }
    }

    pub fn with_where(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_take(mut self, take: u32) -> Self {
        self.take = Some(take);
        self
    }

    /// Render as `select={..}&where=(..)&take=N`.
    ///
    /// Absent `select` or `where` clauses are omitted; `take` always appears.
    pub fn to_query_string(&self) -> String {
        let mut clauses = Vec::with_capacity(3);
        if !self.select.is_empty() {
            clauses.push(format!("select={{{}}}", self.select.join(",")));
        }
        if let Some(filter) = &self.filter {
            let rendered = filter.render();
            if !rendered.is_empty() {
                clauses.push(format!("where=({})", rendered));
            }
        }
        clauses.push(format!("take={}", self.take.unwrap_or(DEFAULT_TAKE)));
        clauses.join("&")
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}
