//! Dataset domain types
//!
//! A dataset is a single tabular resource (`learningData`) plus the column
//! annotations a pipeline was fitted against. The annotations travel with a
//! fitted pipeline so that new input can be scored with the same view of
//! which columns are attributes and which one is the target.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Resource id of the tabular resource every dataset carries
pub const LEARNING_DATA: &str = "learningData";

/// Errors raised while building or re-annotating a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Target index {index} is out of range for {columns} column(s)")]
    TargetOutOfRange { index: usize, columns: usize },

    #[error("Schema mismatch: pipeline was fitted on {expected} column(s), dataset has {found}")]
    SchemaMismatch { expected: usize, found: usize },
}

/// Physical type of a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralType {
    Integer,
    Float,
}

/// Role a column plays in a learning problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    Attribute,
    TrueTarget,
    SuggestedTarget,
}

/// Annotations for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub structural_type: StructuralType,
    pub semantic_types: Vec<SemanticType>,
}

impl ColumnMetadata {
    pub fn is_attribute(&self) -> bool {
        self.semantic_types.contains(&SemanticType::Attribute)
    }

    pub fn is_target(&self) -> bool {
        self.semantic_types.contains(&SemanticType::TrueTarget)
    }
}

/// Dataset-level annotations captured at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub dataset_id: String,
    pub resource_id: String,
    pub columns: Vec<ColumnMetadata>,
    pub target_index: Option<usize>,
}

impl DatasetMetadata {
    /// Infers column annotations from raw values.
    ///
    /// A column is `Integer` when every value is integral, otherwise `Float`.
    /// The column at `target_index` becomes the `TrueTarget`; every other
    /// column is an `Attribute`.
    pub fn infer(
        dataset_id: impl Into<String>,
        column_names: &[String],
        rows: &[Vec<f64>],
        target_index: Option<usize>,
    ) -> Self {
        let columns = column_names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let integral = rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .all(|v| v.is_finite() && v.fract() == 0.0);
                let semantic_types = if Some(idx) == target_index {
                    vec![SemanticType::SuggestedTarget, SemanticType::TrueTarget]
                } else {
                    vec![SemanticType::Attribute]
                };

                ColumnMetadata {
                    name: name.clone(),
                    structural_type: if integral {
                        StructuralType::Integer
                    } else {
                        StructuralType::Float
                    },
                    semantic_types,
                }
            })
            .collect();

        Self {
            dataset_id: dataset_id.into(),
            resource_id: LEARNING_DATA.to_string(),
            columns,
            target_index,
        }
    }

    /// Indices of the attribute columns, in column order
    pub fn attribute_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_attribute())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Index of the true-target column, if any
    pub fn target_column(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.is_target())
    }
}

/// A tabular dataset with its annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub metadata: DatasetMetadata,
    /// Row identifiers, `0..n` unless the caller supplies its own
    pub d3m_index: Vec<i64>,
    pub rows: Vec<Vec<f64>>,
}

impl Dataset {
    /// Builds a dataset from in-memory rows, inferring its annotations
    pub fn new(
        dataset_id: impl Into<String>,
        column_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        target_index: Option<usize>,
    ) -> Result<Self, DatasetError> {
        let width = column_names.len();

        if let Some(index) = target_index {
            if index >= width {
                return Err(DatasetError::TargetOutOfRange {
                    index,
                    columns: width,
                });
            }
        }

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(DatasetError::RaggedRow {
                    row: row_idx,
                    expected: width,
                    found: row.len(),
                });
            }
        }

        let metadata = DatasetMetadata::infer(dataset_id, &column_names, &rows, target_index);
        let d3m_index = (0..rows.len() as i64).collect();

        Ok(Self {
            metadata,
            d3m_index,
            rows,
        })
    }

    /// Reads a dataset from a CSV file with a header row.
    ///
    /// Empty cells become `NaN`. The dataset id is the file stem.
    pub fn from_csv(path: impl AsRef<Path>, target_index: Option<usize>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

        let column_names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let mut row = Vec::with_capacity(record.len());
            for (col_idx, cell) in record.iter().enumerate() {
                if cell.is_empty() {
                    row.push(f64::NAN);
                    continue;
                }
                let value = cell.parse::<f64>().map_err(|_| DatasetError::InvalidValue {
                    row: row_idx,
                    column: column_names.get(col_idx).cloned().unwrap_or_default(),
                    value: cell.to_string(),
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        let dataset_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());

        Self::new(dataset_id, column_names, rows, target_index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_columns(&self) -> usize {
        self.metadata.columns.len()
    }

    /// Attribute columns of every row, as selected by the current annotations
    pub fn features(&self) -> Vec<Vec<f64>> {
        let attributes = self.metadata.attribute_indices();
        self.rows
            .iter()
            .map(|row| attributes.iter().map(|&idx| row[idx]).collect())
            .collect()
    }

    /// Values of the true-target column, if the dataset has one
    pub fn targets(&self) -> Option<Vec<f64>> {
        let target = self.metadata.target_column()?;
        Some(self.rows.iter().map(|row| row[target]).collect())
    }

    /// Replaces this dataset's annotations with ones captured at fit time.
    ///
    /// The column count must match; names and roles are taken from
    /// `metadata` so the dataset is read the way the pipeline was trained.
    pub fn apply_metadata(&mut self, metadata: &DatasetMetadata) -> Result<(), DatasetError> {
        if metadata.columns.len() != self.n_columns() {
            return Err(DatasetError::SchemaMismatch {
                expected: metadata.columns.len(),
                found: self.n_columns(),
            });
        }

        self.metadata = metadata.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_marks_target_and_types() {
        let dataset = Dataset::new(
            "toy",
            names(&["a", "b", "label"]),
            vec![vec![1.0, 0.5, 0.0], vec![2.0, 1.5, 1.0]],
            Some(2),
        )
        .unwrap();

        let cols = &dataset.metadata.columns;
        assert_eq!(cols[0].structural_type, StructuralType::Integer);
        assert_eq!(cols[1].structural_type, StructuralType::Float);
        assert!(cols[2].is_target());
        assert!(!cols[2].is_attribute());
        assert_eq!(dataset.metadata.attribute_indices(), vec![0, 1]);
        assert_eq!(dataset.features(), vec![vec![1.0, 0.5], vec![2.0, 1.5]]);
        assert_eq!(dataset.targets(), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Dataset::new("toy", names(&["a", "b"]), vec![vec![1.0]], None);
        assert!(matches!(result, Err(DatasetError::RaggedRow { row: 0, .. })));
    }

    #[test]
    fn test_target_out_of_range() {
        let result = Dataset::new("toy", names(&["a"]), vec![vec![1.0]], Some(3));
        assert!(matches!(result, Err(DatasetError::TargetOutOfRange { .. })));
    }

    #[test]
    fn test_apply_metadata_restores_target_role() {
        let fitted = Dataset::new(
            "train",
            names(&["a", "label"]),
            vec![vec![1.0, 0.0]],
            Some(1),
        )
        .unwrap();

        // Loaded without a target: every column looks like an attribute
        let mut fresh = Dataset::new("test", names(&["x", "y"]), vec![vec![3.0, 1.0]], None).unwrap();
        assert_eq!(fresh.features(), vec![vec![3.0, 1.0]]);

        fresh.apply_metadata(&fitted.metadata).unwrap();
        assert_eq!(fresh.features(), vec![vec![3.0]]);
        assert_eq!(fresh.metadata.columns[0].name, "a");
    }

    #[test]
    fn test_apply_metadata_rejects_width_change() {
        let fitted = Dataset::new("train", names(&["a", "b"]), vec![], None).unwrap();
        let mut fresh = Dataset::new("test", names(&["a"]), vec![], None).unwrap();

        let result = fresh.apply_metadata(&fitted.metadata);
        assert!(matches!(
            result,
            Err(DatasetError::SchemaMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "value, other, label").unwrap();
        writeln!(file, "1.5, 2, 0").unwrap();
        writeln!(file, ", 3, 1").unwrap();

        let dataset = Dataset::from_csv(&path, Some(2)).unwrap();
        assert_eq!(dataset.metadata.dataset_id, "sensors");
        assert_eq!(dataset.len(), 2);
        assert!(dataset.rows[1][0].is_nan());
        assert_eq!(dataset.d3m_index, vec![0, 1]);
        assert_eq!(dataset.targets(), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_from_csv_rejects_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,hello\n").unwrap();

        let result = Dataset::from_csv(&path, None);
        assert!(matches!(result, Err(DatasetError::InvalidValue { row: 0, .. })));
    }
}
