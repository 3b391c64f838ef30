//! Core module - remote access, configuration and the entity-type registry

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod logging;
pub mod query;
pub mod registry;
pub mod resolver;

pub use client::{ClientError, RemoteApi, RemoteEntity, TpClient};
pub use config::{Config, ConfigError};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use query::{Condition, FieldCondition, Literal, QuerySpec, Where};
pub use registry::{
    CustomFieldSpec, EntityTypeConfig, EntityTypeIds, LinkedRef, Registry, RegistryError,
    StateFixConfig,
};
pub use resolver::{EntityResolver, ResolvedEntitySet};
