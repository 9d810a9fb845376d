//! Array idioms: element-at-a-time loops versus `NumArray` kernels.

use super::{FLOAT_TOLERANCE, INPUT_SEED, IdiomError, finish};
use crate::case::IdiomCase;
use crate::digest::EqualityPolicy;
use crate::output::Output;
use vb_frame::{Column, Table};
use vb_linalg::{matmul, validate_matrix_shape};
use vb_random::DeterministicRng;
use vb_ufunc::{BinaryOp, NumArray};

#[must_use]
pub fn squares_by_push(n: usize) -> NumArray {
    let mut out = Vec::new();
    for i in 0..n {
        let x = i as f64;
        out.push(x * x);
    }
    NumArray::from_vec(out)
}

#[must_use]
pub fn squares_by_power(n: usize) -> NumArray {
    NumArray::arange(n).scalar_binary(BinaryOp::Power, 2.0)
}

pub fn square_sequence_case(n: usize) -> IdiomCase<usize> {
    IdiomCase::new(
        "square_sequence",
        "squares of 0..n: grow a vector one element at a time vs elementwise power",
        EqualityPolicy::Exact,
        move || Ok(n),
        |n| Ok(Output::Array(squares_by_push(n))),
    )
    .candidate("elementwise_power", |n| {
        Ok(Output::Array(squares_by_power(n)))
    })
}

#[must_use]
pub fn doubled_by_push(n: usize) -> NumArray {
    let mut out = Vec::new();
    for i in 0..n {
        out.push((i * 2) as f64);
    }
    NumArray::from_vec(out)
}

#[must_use]
pub fn doubled_by_arange(n: usize) -> NumArray {
    NumArray::arange(n).scalar_binary(BinaryOp::Mul, 2.0)
}

pub fn array_creation_case(n: usize) -> IdiomCase<usize> {
    IdiomCase::new(
        "array_creation",
        "build [0, 2, 4, ...] by appending vs arange * 2",
        EqualityPolicy::Exact,
        move || Ok(n),
        |n| Ok(Output::Array(doubled_by_push(n))),
    )
    .candidate("arange_times_two", |n| {
        Ok(Output::Array(doubled_by_arange(n)))
    })
}

/// Two `dim x dim` matrices with entries in `[-1, 1)`.
pub fn matrix_pair(dim: usize) -> Result<(NumArray, NumArray), IdiomError> {
    let mut rng = DeterministicRng::new(INPUT_SEED);
    let count = dim * dim;
    let lhs = NumArray::new(vec![dim, dim], rng.fill_uniform(count, -1.0, 1.0)?)?;
    let rhs = NumArray::new(vec![dim, dim], rng.fill_uniform(count, -1.0, 1.0)?)?;
    Ok((lhs, rhs))
}

/// Textbook i-j-k triple loop.
pub fn matmul_naive(lhs: &NumArray, rhs: &NumArray) -> Result<NumArray, IdiomError> {
    let (m, k) = validate_matrix_shape(lhs.shape())?;
    let (k2, n) = validate_matrix_shape(rhs.shape())?;
    if k != k2 {
        return Err(vb_linalg::LinAlgError::InnerDimensionMismatch {
            lhs_cols: k,
            rhs_rows: k2,
        }
        .into());
    }
    let a = lhs.values();
    let b = rhs.values();
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0;
            for p in 0..k {
                acc += a[i * k + p] * b[p * n + j];
            }
            out[i * n + j] = acc;
        }
    }
    Ok(NumArray::new(vec![m, n], out)?)
}

pub fn matrix_multiply_case(dim: usize) -> IdiomCase<(NumArray, NumArray)> {
    IdiomCase::new(
        "matrix_multiply",
        "square matrix product: naive triple loop vs library kernel",
        FLOAT_TOLERANCE,
        move || matrix_pair(dim).map_err(|err| err.to_string()),
        |(lhs, rhs)| finish(matmul_naive(&lhs, &rhs)),
    )
    .candidate("linalg_matmul", |(lhs, rhs)| {
        finish(matmul(&lhs, &rhs).map_err(IdiomError::from))
    })
}

/// A single `amount` column of positive sales values.
pub fn amounts_table(rows: usize) -> Result<Table, IdiomError> {
    let mut rng = DeterministicRng::new(INPUT_SEED);
    let amounts = rng.fill_uniform(rows, 10.0, 1_000.0)?;
    Ok(Table::new(vec![("amount".to_string(), Column::F64(amounts))])?)
}

/// `[total, average, max, min]` with one cell-by-cell pass per statistic.
pub fn summary_four_passes(table: &Table) -> Result<Vec<f64>, IdiomError> {
    let rows = table.n_rows();

    let mut total = 0.0;
    for row in 0..rows {
        total += table.get_f64(row, "amount")?;
    }

    let mut mean_acc = 0.0;
    for row in 0..rows {
        mean_acc += table.get_f64(row, "amount")?;
    }
    let average = mean_acc / rows as f64;

    let mut max = f64::NEG_INFINITY;
    for row in 0..rows {
        max = max.max(table.get_f64(row, "amount")?);
    }

    let mut min = f64::INFINITY;
    for row in 0..rows {
        min = min.min(table.get_f64(row, "amount")?);
    }

    Ok(vec![total, average, max, min])
}

pub fn summary_fused_pass(table: &Table) -> Result<Vec<f64>, IdiomError> {
    let amounts = table.f64_column("amount")?;
    let (total, max, min) = amounts.iter().fold(
        (0.0, f64::NEG_INFINITY, f64::INFINITY),
        |(sum, hi, lo), &v| (sum + v, hi.max(v), lo.min(v)),
    );
    Ok(vec![total, total / amounts.len() as f64, max, min])
}

pub fn summary_array_reductions(table: &Table) -> Result<Vec<f64>, IdiomError> {
    let amounts = table.f64_array("amount")?;
    let mut out = Vec::with_capacity(4);
    for reduced in [
        amounts.reduce_sum(None, false)?,
        amounts.reduce_mean(None, false)?,
        amounts.reduce_max(None, false)?,
        amounts.reduce_min(None, false)?,
    ] {
        out.extend_from_slice(reduced.values());
    }
    Ok(out)
}

pub fn summary_statistics_case(rows: usize) -> IdiomCase<Table> {
    IdiomCase::new(
        "summary_statistics",
        "total, average, max and min: four cell-by-cell passes vs one fused pass",
        FLOAT_TOLERANCE,
        move || amounts_table(rows).map_err(|err| err.to_string()),
        |table| finish(summary_four_passes(&table).map(Output::Floats)),
    )
    .candidate("fused_pass", |table| {
        finish(summary_fused_pass(&table).map(Output::Floats))
    })
    .candidate("array_reductions", |table| {
        finish(summary_array_reductions(&table).map(Output::Floats))
    })
}

#[cfg(test)]
mod tests {
    use super::{
        amounts_table, doubled_by_arange, doubled_by_push, matmul_naive, matrix_pair,
        squares_by_power, squares_by_push, summary_array_reductions, summary_four_passes,
        summary_fused_pass,
    };
    use vb_linalg::matmul;
    use vb_ufunc::NumArray;

    #[test]
    fn squares_agree_exactly() {
        assert_eq!(squares_by_push(500), squares_by_power(500));
        assert_eq!(squares_by_power(4).values(), &[0.0, 1.0, 4.0, 9.0]);
        assert!(squares_by_push(0).is_empty());
    }

    #[test]
    fn doubled_arrays_agree_exactly() {
        assert_eq!(doubled_by_push(1000), doubled_by_arange(1000));
        assert_eq!(doubled_by_arange(3).values(), &[0.0, 2.0, 4.0]);
    }

    #[test]
    fn naive_matmul_matches_kernel() {
        let (lhs, rhs) = matrix_pair(9).expect("matrices");
        let naive = matmul_naive(&lhs, &rhs).expect("naive");
        let fast = matmul(&lhs, &rhs).expect("kernel");
        assert_eq!(naive.shape(), fast.shape());
        for (a, b) in naive.values().iter().zip(fast.values()) {
            assert!((a - b).abs() <= 1e-12, "{a} vs {b}");
        }
    }

    #[test]
    fn naive_matmul_small_example() {
        let a = NumArray::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).expect("a");
        let b = NumArray::new(vec![2, 2], vec![5.0, 6.0, 7.0, 8.0]).expect("b");
        let out = matmul_naive(&a, &b).expect("product");
        assert_eq!(out.values(), &[19.0, 22.0, 43.0, 50.0]);
        let bad = NumArray::new(vec![2, 3], vec![0.0; 6]).expect("bad");
        assert!(matmul_naive(&bad, &bad).is_err());
    }

    #[test]
    fn summary_paths_agree() {
        let table = amounts_table(1_000).expect("amounts");
        let slow = summary_four_passes(&table).expect("slow");
        let fused = summary_fused_pass(&table).expect("fused");
        let reduced = summary_array_reductions(&table).expect("reduced");
        assert_eq!(slow.len(), 4);
        assert_eq!(slow, fused);
        for (a, b) in slow.iter().zip(&reduced) {
            assert!((a - b).abs() <= 1e-9 + 1e-9 * a.abs(), "{a} vs {b}");
        }
        assert!(slow[3] <= slow[1] && slow[1] <= slow[2]);
    }
}
