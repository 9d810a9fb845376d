#![forbid(unsafe_code)]

use thiserror::Error;
use vb_ufunc::NumArray;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinAlgError {
    #[error("{0}")]
    ShapeContractViolation(&'static str),
    #[error("inner dimensions differ: lhs cols={lhs_cols} rhs rows={rhs_rows}")]
    InnerDimensionMismatch { lhs_cols: usize, rhs_rows: usize },
}

impl LinAlgError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::ShapeContractViolation(_) => "linalg_shape_contract_violation",
            Self::InnerDimensionMismatch { .. } => "linalg_inner_dimension_mismatch",
        }
    }
}

/// Returns `(rows, cols)` for a strictly 2-D, non-empty matrix shape.
pub fn validate_matrix_shape(shape: &[usize]) -> Result<(usize, usize), LinAlgError> {
    if shape.len() != 2 {
        return Err(LinAlgError::ShapeContractViolation(
            "matrix input must be exactly 2D",
        ));
    }

    let rows = shape[0];
    let cols = shape[1];
    if rows == 0 || cols == 0 {
        return Err(LinAlgError::ShapeContractViolation(
            "matrix rows/cols must be non-zero",
        ));
    }

    Ok((rows, cols))
}

/// Matrix product in i-k-j order so the innermost loop walks both the
/// right-hand row and the output row contiguously.
pub fn matmul(lhs: &NumArray, rhs: &NumArray) -> Result<NumArray, LinAlgError> {
    let (m, k) = validate_matrix_shape(lhs.shape())?;
    let (k2, n) = validate_matrix_shape(rhs.shape())?;
    if k != k2 {
        return Err(LinAlgError::InnerDimensionMismatch {
            lhs_cols: k,
            rhs_rows: k2,
        });
    }

    let a = lhs.values();
    let b = rhs.values();
    let mut out = vec![0.0f64; m * n];
    for i in 0..m {
        let out_row = &mut out[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            for (o, &b_pj) in out_row.iter_mut().zip(b_row) {
                *o += a_ip * b_pj;
            }
        }
    }

    NumArray::new(vec![m, n], out)
        .map_err(|_| LinAlgError::ShapeContractViolation("matmul output shape rejected"))
}
