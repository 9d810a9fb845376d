//! Built-in slow/fast idiom pairs.
//!
//! Every idiom is a set of plain functions (reference first, then the
//! candidates) plus a deterministic input generator. `builtin_catalog` wires
//! them into [`crate::IdiomCase`]s.

pub mod frames;
pub mod numeric;
pub mod regions;
pub mod sequences;

use crate::case::CaseRunner;
use crate::digest::EqualityPolicy;
use crate::error::HarnessError;
use crate::output::Output;
use crate::registry::{Catalog, register_boxed};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vb_frame::FrameError;
use vb_linalg::LinAlgError;
use vb_random::{DEFAULT_RNG_SEED, RandomError};
use vb_ufunc::UFuncError;

/// Seed every generator starts from, so repeated generation is identical.
pub const INPUT_SEED: u64 = DEFAULT_RNG_SEED;

pub const FLOAT_TOLERANCE: EqualityPolicy = EqualityPolicy::Tolerance {
    abs_tol: 1e-9,
    rel_tol: 1e-9,
};

/// Failures inside idiom implementations and generators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdiomError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    UFunc(#[from] UFuncError),
    #[error(transparent)]
    LinAlg(#[from] LinAlgError),
    #[error(transparent)]
    Random(#[from] RandomError),
    #[error("unexpected cell value in column '{0}'")]
    CellValue(String),
}

impl IdiomError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Frame(err) => err.reason_code(),
            Self::UFunc(err) => err.reason_code(),
            Self::LinAlg(err) => err.reason_code(),
            Self::Random(err) => err.reason_code(),
            Self::CellValue(_) => "idiom_cell_value_unexpected",
        }
    }
}

/// Input sizes for the built-in cases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalogSizes {
    pub frame_rows: usize,
    pub string_items: usize,
    pub sum_of_squares_n: u64,
    pub count_items: usize,
    pub distinct_keys: usize,
    pub accumulator_items: usize,
    pub array_len: usize,
    pub concat_parts: usize,
    pub concat_part_rows: usize,
    pub matrix_dim: usize,
    pub product_rows: usize,
    pub customer_rows: usize,
    pub statistics_rows: usize,
    pub sales_per_region: usize,
    pub filter_threshold: f64,
}

impl Default for CatalogSizes {
    fn default() -> Self {
        Self {
            frame_rows: 10_000,
            string_items: 10_000,
            sum_of_squares_n: 1_000_000,
            count_items: 10_000,
            distinct_keys: 100,
            accumulator_items: 1_000_000,
            array_len: 100_000,
            concat_parts: 100,
            concat_part_rows: 100,
            matrix_dim: 128,
            product_rows: 10_000,
            customer_rows: 10_000,
            statistics_rows: 100_000,
            sales_per_region: 25_000,
            filter_threshold: 0.5,
        }
    }
}

impl CatalogSizes {
    /// Small inputs for tests and quick checks.
    #[must_use]
    pub fn smoke() -> Self {
        Self {
            frame_rows: 200,
            string_items: 100,
            sum_of_squares_n: 10_000,
            count_items: 500,
            distinct_keys: 20,
            accumulator_items: 1_000,
            array_len: 1_000,
            concat_parts: 10,
            concat_part_rows: 10,
            matrix_dim: 12,
            product_rows: 200,
            customer_rows: 200,
            statistics_rows: 1_000,
            sales_per_region: 250,
            filter_threshold: 0.5,
        }
    }
}

pub(crate) fn finish<T: Into<Output>>(result: Result<T, IdiomError>) -> Result<Output, String> {
    result
        .map(Into::into)
        .map_err(|err| format!("{err} ({})", err.reason_code()))
}

/// The full built-in catalog, in presentation order.
pub fn builtin_catalog(sizes: &CatalogSizes) -> Result<Catalog, HarnessError> {
    let mut catalog = Catalog::new();
    for case in builtin_cases(sizes) {
        catalog.register_boxed(case)?;
    }
    Ok(catalog)
}

fn builtin_cases(sizes: &CatalogSizes) -> Vec<Box<dyn CaseRunner>> {
    vec![
        Box::new(frames::row_arithmetic_case(sizes.frame_rows)),
        Box::new(sequences::string_join_case(sizes.string_items)),
        Box::new(sequences::sum_of_squares_case(sizes.sum_of_squares_n)),
        Box::new(numeric::square_sequence_case(sizes.array_len)),
        Box::new(frames::threshold_filter_case(
            sizes.frame_rows,
            sizes.filter_threshold,
        )),
        Box::new(sequences::count_items_case(
            sizes.count_items,
            sizes.distinct_keys,
        )),
        Box::new(sequences::accumulator_case(sizes.accumulator_items)),
        Box::new(numeric::array_creation_case(sizes.array_len)),
        Box::new(frames::frame_concat_case(
            sizes.concat_parts,
            sizes.concat_part_rows,
        )),
        Box::new(numeric::matrix_multiply_case(sizes.matrix_dim)),
        Box::new(frames::product_metrics_case(sizes.product_rows)),
        Box::new(frames::email_validation_case(sizes.customer_rows)),
        Box::new(numeric::summary_statistics_case(sizes.statistics_rows)),
        Box::new(regions::regional_statistics_case(sizes.sales_per_region)),
        Box::new(regions::region_share_case(sizes.sales_per_region)),
    ]
}

/// Registers the built-in catalog into the process-wide registry. Cases that
/// are already present are left alone, so calling this twice is harmless.
pub fn install_builtin_catalog(sizes: &CatalogSizes) -> Result<usize, HarnessError> {
    let mut added = 0;
    for case in builtin_cases(sizes) {
        match register_boxed(case) {
            Ok(()) => added += 1,
            Err(HarnessError::DuplicateCase(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(added)
}
