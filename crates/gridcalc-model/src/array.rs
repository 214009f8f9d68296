use serde::{Deserialize, Serialize};

use crate::Value;

/// A rectangular, non-empty 2D block of scalar values in row-major order.
///
/// Construction enforces the shape invariants, so consumers can index
/// without re-validating. Elements are scalars; nesting an
/// [`Value::Array`] inside another array is rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Array {
    rows: usize,
    cols: usize,
    data: Vec<Value>,
}

/// Errors from constructing an [`Array`] with an invalid shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrayShapeError {
    #[error("array must have at least one row and one column")]
    Empty,
    #[error("array rows must share one width: row {row} has {got} values, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("array data holds {got} values, expected {rows}x{cols}")]
    LengthMismatch { rows: usize, cols: usize, got: usize },
    #[error("array elements must be scalars")]
    NestedArray,
}

impl Array {
    /// Build from rows of values; every row must have the same non-zero width.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Result<Self, ArrayShapeError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(ArrayShapeError::Empty);
        }
        let mut data = Vec::with_capacity(height * width);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(ArrayShapeError::Ragged {
                    row: i,
                    expected: width,
                    got: row.len(),
                });
            }
            for value in row {
                if matches!(value, Value::Array(_)) {
                    return Err(ArrayShapeError::NestedArray);
                }
                data.push(value);
            }
        }
        Ok(Self {
            rows: height,
            cols: width,
            data,
        })
    }

    /// Build from an explicit shape plus row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Value>) -> Result<Self, ArrayShapeError> {
        if rows == 0 || cols == 0 {
            return Err(ArrayShapeError::Empty);
        }
        if data.len() != rows * cols {
            return Err(ArrayShapeError::LengthMismatch {
                rows,
                cols,
                got: data.len(),
            });
        }
        if data.iter().any(|v| matches!(v, Value::Array(_))) {
            return Err(ArrayShapeError::NestedArray);
        }
        Ok(Self { rows, cols, data })
    }

    /// A 1x1 array holding one scalar.
    pub fn scalar(value: Value) -> Self {
        debug_assert!(!matches!(value, Value::Array(_)));
        Self {
            rows: 1,
            cols: 1,
            data: vec![value],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        // Shape invariants make this impossible; kept for clippy symmetry.
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// The anchor (row 0, column 0) element.
    pub fn top_left(&self) -> &Value {
        &self.data[0]
    }

    /// Row-major traversal of every element.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.data.iter()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Value]> {
        self.data.chunks(self.cols)
    }

    pub fn into_data(self) -> Vec<Value> {
        self.data
    }
}
