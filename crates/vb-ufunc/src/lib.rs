#![forbid(unsafe_code)]

use thiserror::Error;
use vb_ndarray::{
    ShapeError, broadcast_axis_steps, broadcast_shape, element_count, fix_unknown_dimension,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Power,
}

impl BinaryOp {
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
            Self::Power => {
                // Integral exponents go through powi so small squares stay exact.
                if rhs.fract() == 0.0 && rhs.abs() <= f64::from(i32::MAX) {
                    lhs.powi(rhs as i32)
                } else {
                    lhs.powf(rhs)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

/// Dense row-major f64 array with an explicit shape.
#[derive(Debug, Clone, PartialEq)]
pub struct NumArray {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl NumArray {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self, UFuncError> {
        let expected = element_count(&shape).map_err(UFuncError::Shape)?;
        if values.len() != expected {
            return Err(UFuncError::InvalidInputLength {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    #[must_use]
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    /// `[0, 1, ..., n - 1]` as a 1-D array.
    #[must_use]
    pub fn arange(n: usize) -> Self {
        Self::from_vec((0..n).map(|i| i as f64).collect())
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn reshape(self, new_shape: &[isize]) -> Result<Self, UFuncError> {
        let shape =
            fix_unknown_dimension(new_shape, self.values.len()).map_err(UFuncError::Shape)?;
        Ok(Self {
            shape,
            values: self.values,
        })
    }

    pub fn elementwise_binary(&self, rhs: &Self, op: BinaryOp) -> Result<Self, UFuncError> {
        let out_shape = broadcast_shape(&self.shape, &rhs.shape).map_err(UFuncError::Shape)?;
        let out_count = element_count(&out_shape).map_err(UFuncError::Shape)?;

        if self.shape == rhs.shape {
            let values = self
                .values
                .iter()
                .zip(&rhs.values)
                .map(|(&lhs, &rhs)| op.apply(lhs, rhs))
                .collect::<Vec<_>>();
            return Ok(Self {
                shape: out_shape,
                values,
            });
        }

        let lhs_axis_steps = broadcast_axis_steps(out_shape.len(), &self.shape);
        let rhs_axis_steps = broadcast_axis_steps(out_shape.len(), &rhs.shape);

        let mut out_multi = vec![0usize; out_shape.len()];
        let mut lhs_flat = 0usize;
        let mut rhs_flat = 0usize;
        let mut out_values = Vec::with_capacity(out_count);

        for flat in 0..out_count {
            out_values.push(op.apply(self.values[lhs_flat], rhs.values[rhs_flat]));

            // Advance the output index as an odometer and move both source
            // offsets incrementally instead of re-unravelling every element.
            if flat + 1 == out_count || out_shape.is_empty() {
                continue;
            }

            for axis in (0..out_shape.len()).rev() {
                out_multi[axis] += 1;
                lhs_flat += lhs_axis_steps[axis];
                rhs_flat += rhs_axis_steps[axis];

                if out_multi[axis] < out_shape[axis] {
                    break;
                }

                out_multi[axis] = 0;
                lhs_flat -= lhs_axis_steps[axis] * out_shape[axis];
                rhs_flat -= rhs_axis_steps[axis] * out_shape[axis];
            }
        }

        Ok(Self {
            shape: out_shape,
            values: out_values,
        })
    }

    /// Broadcasts a scalar right-hand side over every element.
    #[must_use]
    pub fn scalar_binary(&self, op: BinaryOp, rhs: f64) -> Self {
        Self {
            shape: self.shape.clone(),
            values: self.values.iter().map(|&v| op.apply(v, rhs)).collect(),
        }
    }

    #[must_use]
    pub fn compare_scalar(&self, op: CompareOp, rhs: f64) -> Vec<bool> {
        self.values.iter().map(|&v| op.apply(v, rhs)).collect()
    }

    pub fn reduce_sum(&self, axis: Option<isize>, keepdims: bool) -> Result<Self, UFuncError> {
        self.reduce_with(
            axis,
            keepdims,
            0.0,
            |values| values.iter().copied().sum(),
            |acc, v| acc + v,
        )
    }

    pub fn reduce_min(&self, axis: Option<isize>, keepdims: bool) -> Result<Self, UFuncError> {
        self.reduce_with(
            axis,
            keepdims,
            f64::INFINITY,
            |values| values.iter().copied().fold(f64::INFINITY, f64::min),
            f64::min,
        )
    }

    pub fn reduce_max(&self, axis: Option<isize>, keepdims: bool) -> Result<Self, UFuncError> {
        self.reduce_with(
            axis,
            keepdims,
            f64::NEG_INFINITY,
            |values| values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            f64::max,
        )
    }

    pub fn reduce_mean(&self, axis: Option<isize>, keepdims: bool) -> Result<Self, UFuncError> {
        let mut out = self.reduce_sum(axis, keepdims)?;
        let count = match axis {
            None => self.values.len(),
            Some(axis) => self.shape[normalize_axis(axis, self.shape.len())?],
        };
        let n = count as f64;
        for v in &mut out.values {
            *v /= n;
        }
        Ok(out)
    }

    fn reduce_with(
        &self,
        axis: Option<isize>,
        keepdims: bool,
        identity: f64,
        reduce_all: impl Fn(&[f64]) -> f64,
        fold: impl Fn(f64, f64) -> f64,
    ) -> Result<Self, UFuncError> {
        match axis {
            None => {
                let shape = if keepdims {
                    vec![1; self.shape.len()]
                } else {
                    Vec::new()
                };
                Ok(Self {
                    shape,
                    values: vec![reduce_all(&self.values)],
                })
            }
            Some(axis) => {
                let axis = normalize_axis(axis, self.shape.len())?;
                let out_shape = reduced_shape(&self.shape, axis, keepdims);
                let out_count = element_count(&out_shape).map_err(UFuncError::Shape)?;
                let mut out_values = vec![identity; out_count];
                reduce_fold_axis_contiguous(
                    &self.values,
                    &self.shape,
                    axis,
                    &mut out_values,
                    fold,
                );
                Ok(Self {
                    shape: out_shape,
                    values: out_values,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UFuncError {
    #[error("shape error: {0}")]
    Shape(ShapeError),
    #[error("invalid input length expected={expected} actual={actual}")]
    InvalidInputLength { expected: usize, actual: usize },
    #[error("axis {axis} out of bounds for ndim={ndim}")]
    AxisOutOfBounds { axis: isize, ndim: usize },
}

impl UFuncError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Shape(_) => "ufunc_shape_contract_violation",
            Self::InvalidInputLength { .. } => "ufunc_invalid_input_length",
            Self::AxisOutOfBounds { .. } => "ufunc_axis_out_of_bounds",
        }
    }
}

fn reduce_fold_axis_contiguous(
    values: &[f64],
    shape: &[usize],
    axis: usize,
    out_values: &mut [f64],
    fold: impl Fn(f64, f64) -> f64,
) {
    debug_assert!(axis < shape.len());
    if out_values.is_empty() {
        return;
    }

    let axis_len = shape[axis];
    if axis_len == 0 {
        return;
    }

    let inner = shape[axis + 1..].iter().copied().product::<usize>();
    let outer = shape[..axis].iter().copied().product::<usize>();

    let mut out_flat = 0usize;
    for outer_idx in 0..outer {
        let base = outer_idx * axis_len * inner;
        for inner_idx in 0..inner {
            let mut offset = base + inner_idx;
            let mut acc = values[offset];
            offset += inner;
            for _ in 1..axis_len {
                acc = fold(acc, values[offset]);
                offset += inner;
            }
            out_values[out_flat] = acc;
            out_flat += 1;
        }
    }
}

#[must_use]
fn reduced_shape(shape: &[usize], axis: usize, keepdims: bool) -> Vec<usize> {
    if keepdims {
        shape
            .iter()
            .enumerate()
            .map(|(idx, &dim)| if idx == axis { 1 } else { dim })
            .collect()
    } else {
        shape
            .iter()
            .enumerate()
            .filter_map(|(idx, &dim)| (idx != axis).then_some(dim))
            .collect()
    }
}

fn normalize_axis(axis: isize, ndim: usize) -> Result<usize, UFuncError> {
    let out_of_bounds = UFuncError::AxisOutOfBounds { axis, ndim };
    let ndim_i = isize::try_from(ndim).map_err(|_| out_of_bounds.clone())?;
    let normalized = if axis < 0 { ndim_i + axis } else { axis };
    if normalized < 0 || normalized >= ndim_i {
        return Err(out_of_bounds);
    }
    usize::try_from(normalized).map_err(|_| out_of_bounds)
}

#[cfg(test)]
mod tests {
    use super::{BinaryOp, CompareOp, NumArray, UFuncError};

    #[test]
    fn broadcasted_add_matches_expected_values() {
        let lhs = NumArray::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("lhs");
        let rhs = NumArray::new(vec![3], vec![10.0, 20.0, 30.0]).expect("rhs");

        let out = lhs
            .elementwise_binary(&rhs, BinaryOp::Add)
            .expect("broadcasted add");

        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.values(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn column_broadcast_uses_zero_steps() {
        let lhs = NumArray::new(vec![2, 1], vec![1.0, 2.0]).expect("lhs");
        let rhs = NumArray::new(vec![1, 3], vec![10.0, 20.0, 30.0]).expect("rhs");
        let out = lhs.elementwise_binary(&rhs, BinaryOp::Mul).expect("outer");
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.values(), &[10.0, 20.0, 30.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn row_totals_divide_each_row() {
        let matrix = NumArray::arange(6).reshape(&[2, -1]).expect("reshape");
        let totals = matrix.reduce_sum(Some(1), true).expect("row totals");
        let shares = matrix
            .elementwise_binary(&totals, BinaryOp::Div)
            .expect("broadcast divide");
        assert_eq!(shares.shape(), &[2, 3]);
        assert_eq!(shares.values(), &[0.0, 1.0 / 3.0, 2.0 / 3.0, 0.25, 4.0 / 12.0, 5.0 / 12.0]);
    }

    #[test]
    fn zero_dimensional_rhs_broadcasts() {
        let lhs = NumArray::arange(4);
        let two = NumArray::new(Vec::new(), vec![2.0]).expect("0-d");
        let out = lhs.elementwise_binary(&two, BinaryOp::Mul).expect("scalar mul");
        assert_eq!(out.values(), &[0.0, 2.0, 4.0, 6.0]);
        assert_eq!(lhs.scalar_binary(BinaryOp::Mul, 2.0), out);
    }

    #[test]
    fn incompatible_shapes_are_rejected() {
        let lhs = NumArray::arange(3);
        let rhs = NumArray::arange(4);
        let err = lhs
            .elementwise_binary(&rhs, BinaryOp::Add)
            .expect_err("should fail");
        assert_eq!(err.reason_code(), "ufunc_shape_contract_violation");
    }

    #[test]
    fn power_with_integral_exponent_is_exact() {
        let out = NumArray::arange(5).scalar_binary(BinaryOp::Power, 2.0);
        assert_eq!(out.values(), &[0.0, 1.0, 4.0, 9.0, 16.0]);
        assert_eq!(BinaryOp::Power.apply(2.0, 3.0), 8.0);
    }

    #[test]
    fn compare_builds_masks() {
        let arr = NumArray::from_vec(vec![0.3, 0.6, 0.8, 0.4]);
        assert_eq!(
            arr.compare_scalar(CompareOp::Gt, 0.5),
            vec![false, true, true, false]
        );
        assert_eq!(
            arr.compare_scalar(CompareOp::Le, 0.4),
            vec![true, false, false, true]
        );
    }

    #[test]
    fn reshape_checks_element_count() {
        let err = NumArray::arange(6).reshape(&[4, -1]).expect_err("6 over 4 rows");
        assert_eq!(err.reason_code(), "ufunc_shape_contract_violation");
        let err = NumArray::new(vec![2, 2], vec![1.0]).expect_err("length");
        assert!(matches!(
            err,
            UFuncError::InvalidInputLength {
                expected: 4,
                actual: 1
            }
        ));
    }

    #[test]
    fn reductions_over_axes() {
        let arr = NumArray::arange(6).reshape(&[2, -1]).expect("reshape");
        assert_eq!(arr.shape(), &[2, 3]);

        let sum0 = arr.reduce_sum(Some(0), false).expect("sum axis 0");
        assert_eq!(sum0.values(), &[3.0, 5.0, 7.0]);
        let sum1 = arr.reduce_sum(Some(-1), true).expect("sum axis -1");
        assert_eq!(sum1.shape(), &[2, 1]);
        assert_eq!(sum1.values(), &[3.0, 12.0]);

        assert_eq!(arr.reduce_sum(None, false).expect("sum").values(), &[15.0]);
        assert_eq!(arr.reduce_min(None, false).expect("min").values(), &[0.0]);
        assert_eq!(arr.reduce_max(Some(1), false).expect("max").values(), &[2.0, 5.0]);
        assert_eq!(arr.reduce_mean(Some(1), false).expect("mean").values(), &[1.0, 4.0]);
        assert_eq!(arr.reduce_mean(None, false).expect("mean").values(), &[2.5]);
    }

    #[test]
    fn reduce_rejects_out_of_bounds_axis() {
        let err = NumArray::arange(3)
            .reduce_sum(Some(-2), false)
            .expect_err("axis should be rejected");
        assert!(matches!(err, UFuncError::AxisOutOfBounds { axis: -2, ndim: 1 }));
    }
}
