#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("invalid dimension {0}")]
    InvalidDimension(isize),
    #[error("only one -1 dimension is allowed")]
    MultipleUnknownDimensions,
    #[error("size arithmetic overflow")]
    Overflow,
    #[error("cannot broadcast {lhs:?} with {rhs:?}")]
    IncompatibleBroadcast { lhs: Vec<usize>, rhs: Vec<usize> },
    #[error("element count mismatch old={old} new={new}")]
    IncompatibleElementCount { old: usize, new: usize },
}

impl ShapeError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidDimension(_) | Self::MultipleUnknownDimensions => {
                "shape_dimension_invalid"
            }
            Self::Overflow => "shape_size_overflow",
            Self::IncompatibleBroadcast { .. } => "shape_broadcast_incompatible",
            Self::IncompatibleElementCount { .. } => "shape_element_count_mismatch",
        }
    }
}

pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, ShapeError> {
    let nd = lhs.len().max(rhs.len());
    let mut out = Vec::with_capacity(nd);

    for idx in 0..nd {
        let l = *lhs.get(lhs.len().wrapping_sub(1 + idx)).unwrap_or(&1);
        let r = *rhs.get(rhs.len().wrapping_sub(1 + idx)).unwrap_or(&1);

        let merged = if l == r {
            l
        } else if l == 1 {
            r
        } else if r == 1 {
            l
        } else {
            return Err(ShapeError::IncompatibleBroadcast {
                lhs: lhs.to_vec(),
                rhs: rhs.to_vec(),
            });
        };

        out.push(merged);
    }

    out.reverse();
    Ok(out)
}

pub fn element_count(shape: &[usize]) -> Result<usize, ShapeError> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        acc.checked_mul(dim).ok_or(ShapeError::Overflow)
    })
}

/// Resolves a reshape request that may contain a single `-1` placeholder.
pub fn fix_unknown_dimension(
    new_shape: &[isize],
    old_element_count: usize,
) -> Result<Vec<usize>, ShapeError> {
    let mut known_product: usize = 1;
    let mut unknown_index: Option<usize> = None;
    let mut out = Vec::with_capacity(new_shape.len());

    for (idx, &dim) in new_shape.iter().enumerate() {
        match dim {
            -1 => {
                if unknown_index.replace(idx).is_some() {
                    return Err(ShapeError::MultipleUnknownDimensions);
                }
                out.push(0);
            }
            d if d < -1 => return Err(ShapeError::InvalidDimension(d)),
            d => {
                let d = usize::try_from(d).map_err(|_| ShapeError::InvalidDimension(d))?;
                known_product = known_product.checked_mul(d).ok_or(ShapeError::Overflow)?;
                out.push(d);
            }
        }
    }

    match unknown_index {
        Some(idx) => {
            if known_product == 0 || !old_element_count.is_multiple_of(known_product) {
                return Err(ShapeError::IncompatibleElementCount {
                    old: old_element_count,
                    new: known_product,
                });
            }
            out[idx] = old_element_count / known_product;
        }
        None => {
            if known_product != old_element_count {
                return Err(ShapeError::IncompatibleElementCount {
                    old: old_element_count,
                    new: known_product,
                });
            }
        }
    }

    Ok(out)
}

/// Row-major strides measured in elements, not bytes.
#[must_use]
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; shape.len()];
    let mut stride = 1usize;
    for (i, &dim) in shape.iter().enumerate().rev() {
        strides[i] = stride;
        stride = stride.saturating_mul(dim);
    }
    strides
}

/// Per-axis flat-index step of a source array aligned to the right of an
/// output of rank `out_ndim`. Broadcast axes (length 1 or missing) step by 0.
#[must_use]
pub fn broadcast_axis_steps(out_ndim: usize, src_shape: &[usize]) -> Vec<usize> {
    let src_strides = contiguous_strides(src_shape);
    let offset = out_ndim - src_shape.len();
    let mut steps = vec![0usize; out_ndim];
    for (axis, (&dim, &stride)) in src_shape.iter().zip(&src_strides).enumerate() {
        if dim != 1 {
            steps[axis + offset] = stride;
        }
    }
    steps
}
