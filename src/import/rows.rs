//! Tabular input: CSV files with a header row, read into column-keyed rows

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error in {path} at row {row}: {message}")]
    Csv {
        path: PathBuf,
        row: usize,
        message: String,
    },
}

/// One data row, values keyed by header name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// 1-based line in the source file (the header is line 1)
    pub line: usize,
    values: HashMap<String, String>,
}

impl Row {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            values: HashMap::new(),
        }
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<'a>(line: usize, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            line,
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Raw value of `column`, `None` when absent or blank
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Build a map from header name to column index
fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect()
}

/// Parse CSV `data` into rows; `path` is only used in errors
pub fn parse_rows(data: &[u8], path: &Path) -> Result<Vec<Row>, RowsError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = rdr
        .headers()
        .map_err(|e| RowsError::Csv {
            path: path.to_path_buf(),
            row: 1,
            message: e.to_string(),
        })?
        .clone();
    let header_map = build_header_map(&headers);

    let mut rows = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let line = row_idx + 2;
        let record = result.map_err(|e| RowsError::Csv {
            path: path.to_path_buf(),
            row: line,
            message: e.to_string(),
        })?;

        let values = header_map
            .iter()
            .filter_map(|(name, &idx)| record.get(idx).map(|v| (name.clone(), v.to_string())))
            .collect();
        rows.push(Row { line, values });
    }
    Ok(rows)
}

/// Read and parse a CSV file without blocking the runtime
pub async fn read_rows(path: &Path) -> Result<Vec<Row>, RowsError> {
    let data = tokio::fs::read(path).await.map_err(|source| RowsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = parse_rows(&data, path)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "Parsed CSV");
    Ok(rows)
}
