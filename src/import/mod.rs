//! Import pipeline - CSV rows to remote entities, stage by stage

pub mod mapper;
pub mod pipeline;
pub mod progress;
pub mod rows;
pub mod stage;
pub mod state_fixer;

pub use mapper::{map_row, CustomFieldValue, EntityPayload, MappedRow, UnresolvedLink};
pub use pipeline::{discover_type_ids, ImportPipeline, InputFiles, PipelineError, PipelineReport};
pub use progress::{ConsoleProgress, NoProgress, Progress};
pub use rows::{parse_rows, read_rows, Row, RowsError};
pub use stage::{ImportStage, Outcome, StageContext, StageResult};
pub use state_fixer::{FixOutcome, StateFixResult, StateFixer};
