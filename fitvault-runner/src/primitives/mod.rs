//! Built-in primitives
//!
//! Preprocessing steps keep plain state values. Detectors keep a model
//! carrier; the network detectors attach native handles to it, the z-score
//! detector keeps a plain carrier.

pub mod detectors;
pub mod preprocessing;

pub use detectors::{NetworkDetector, NetworkKind, ZScoreDetector};
pub use preprocessing::{ImputeMissing, StandardScaler};

use crate::error::BackendError;
use crate::primitive::PrimitiveRegistry;
use ndarray::{Array1, Array2, Axis};

/// Packs equally wide rows into a `(rows, columns)` matrix
pub(crate) fn to_matrix(rows: &[Vec<f64>]) -> Result<Array2<f64>, BackendError> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if let Some((row, found)) = rows
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, len)| len != width)
    {
        return Err(BackendError::RaggedRows {
            row,
            expected: width,
            found,
        });
    }

    let values = rows.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((rows.len(), width), values)?)
}

pub(crate) fn to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Column means and standard deviations; constant columns get a scale of 1
pub(crate) fn column_stats(x: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>), BackendError> {
    let mean = x.mean_axis(Axis(0)).ok_or(BackendError::EmptyDataset)?;
    let scale = x
        .var_axis(Axis(0), 0.0)
        .mapv_into(|var| if var > 0.0 { var.sqrt() } else { 1.0 });
    Ok((mean, scale))
}

impl PrimitiveRegistry {
    /// Registry holding every built-in primitive
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(StandardScaler);
        registry.register(ImputeMissing);
        for kind in NetworkKind::ALL {
            registry.register(NetworkDetector::new(kind));
        }
        registry.register(ZScoreDetector);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_column_stats() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let (mean, scale) = column_stats(&x).unwrap();
        assert_eq!(mean, array![2.0, 5.0]);
        assert_eq!(scale, array![1.0, 1.0]);

        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(column_stats(&empty), Err(BackendError::EmptyDataset)));
    }

    #[test]
    fn test_to_matrix_rejects_ragged_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0]];
        assert!(matches!(
            to_matrix(&rows),
            Err(BackendError::RaggedRows {
                row: 2,
                expected: 2,
                found: 1
            })
        ));

        let matrix = to_matrix(&rows[..2]).unwrap();
        assert_eq!(matrix, array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(to_rows(&matrix), rows[..2].to_vec());
    }

    #[test]
    fn test_builtin_ids() {
        let registry = PrimitiveRegistry::builtin();
        for id in [
            "data_processing.standard_scaler",
            "data_processing.impute_missing",
            "detection.auto_encoder",
            "detection.vae",
            "detection.so_gaal",
            "detection.mo_gaal",
            "detection.lstm_od",
            "detection.deeplog",
            "detection.telemanom",
            "detection.zscore",
        ] {
            assert!(registry.get(id).is_some(), "missing primitive {}", id);
        }
        assert_eq!(registry.primitives().len(), 10);
    }
}
