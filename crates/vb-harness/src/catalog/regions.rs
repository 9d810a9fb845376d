//! Regional sales idioms: one copy of the analysis per region versus a
//! region-by-sale matrix reduced along its rows.

use super::numeric::summary_four_passes;
use super::{FLOAT_TOLERANCE, INPUT_SEED, IdiomError, finish};
use crate::case::IdiomCase;
use crate::output::Output;
use vb_frame::{Column, Table, Value};
use vb_random::DeterministicRng;
use vb_ufunc::{BinaryOp, NumArray};

pub const REGIONS: [&str; 4] = ["north", "south", "east", "west"];

/// Sales stored region by region, `sales_per_region` rows each, with an
/// `i64` region index and an `f64` amount.
pub fn regional_sales(sales_per_region: usize) -> Result<Table, IdiomError> {
    let mut rng = DeterministicRng::new(INPUT_SEED);
    let total = REGIONS.len() * sales_per_region;
    let mut region = Vec::with_capacity(total);
    let mut amount = Vec::with_capacity(total);
    for idx in 0..REGIONS.len() {
        region.extend(std::iter::repeat_n(idx as i64, sales_per_region));
        amount.extend(rng.fill_uniform(sales_per_region, 10.0, 1_000.0)?);
    }
    Ok(Table::new(vec![
        ("region".to_string(), Column::I64(region)),
        ("amount".to_string(), Column::F64(amount)),
    ])?)
}

/// Amounts as a `[regions, sales]` matrix. Relies on the region-major row
/// layout `regional_sales` produces.
fn amounts_by_region(table: &Table) -> Result<NumArray, IdiomError> {
    Ok(table
        .f64_array("amount")?
        .reshape(&[REGIONS.len() as isize, -1])?)
}

/// `[total, average, max, min]` per region, each region filtered out of the
/// table and analysed separately.
pub fn regional_statistics_per_region(table: &Table) -> Result<Vec<f64>, IdiomError> {
    let mut out = Vec::with_capacity(REGIONS.len() * 4);
    for idx in 0..REGIONS.len() {
        let mut mask = Vec::with_capacity(table.n_rows());
        for row in 0..table.n_rows() {
            let region = table.get(row, "region")?;
            mask.push(matches!(region, Value::I64(r) if r == idx as i64));
        }
        out.extend(summary_four_passes(&table.filter(&mask)?)?);
    }
    Ok(out)
}

pub fn regional_statistics_axis_reductions(table: &Table) -> Result<Vec<f64>, IdiomError> {
    let matrix = amounts_by_region(table)?;
    let stats = [
        matrix.reduce_sum(Some(1), false)?,
        matrix.reduce_mean(Some(1), false)?,
        matrix.reduce_max(Some(1), false)?,
        matrix.reduce_min(Some(1), false)?,
    ];
    let mut out = Vec::with_capacity(REGIONS.len() * stats.len());
    for region in 0..REGIONS.len() {
        out.extend(stats.iter().map(|stat| stat.values()[region]));
    }
    Ok(out)
}

pub fn regional_statistics_case(sales_per_region: usize) -> IdiomCase<Table> {
    IdiomCase::new(
        "regional_statistics",
        "per-region total, average, max and min: a filtered pass per region vs axis reductions",
        FLOAT_TOLERANCE,
        move || regional_sales(sales_per_region).map_err(|err| err.to_string()),
        |table| finish(regional_statistics_per_region(&table).map(Output::Floats)),
    )
    .candidate("axis_reductions", |table| {
        finish(regional_statistics_axis_reductions(&table).map(Output::Floats))
    })
}

/// Each sale as a percentage of its region's total, looked up row by row.
pub fn region_share_rowwise(table: &Table) -> Result<Vec<f64>, IdiomError> {
    let mut totals = [0.0; REGIONS.len()];
    for row in 0..table.n_rows() {
        let region = region_index(table, row)?;
        totals[region] += table.get_f64(row, "amount")?;
    }

    let mut shares = Vec::with_capacity(table.n_rows());
    for row in 0..table.n_rows() {
        let region = region_index(table, row)?;
        shares.push(table.get_f64(row, "amount")? / totals[region] * 100.0);
    }
    Ok(shares)
}

fn region_index(table: &Table, row: usize) -> Result<usize, IdiomError> {
    match table.get(row, "region")? {
        Value::I64(idx) => usize::try_from(idx)
            .ok()
            .filter(|&idx| idx < REGIONS.len())
            .ok_or_else(|| IdiomError::CellValue("region".to_string())),
        _ => Err(IdiomError::CellValue("region".to_string())),
    }
}

/// Row totals kept as a `[regions, 1]` column and broadcast across each row.
pub fn region_share_broadcast(table: &Table) -> Result<Vec<f64>, IdiomError> {
    let matrix = amounts_by_region(table)?;
    let totals = matrix.reduce_sum(Some(1), true)?;
    let shares = matrix
        .elementwise_binary(&totals, BinaryOp::Div)?
        .scalar_binary(BinaryOp::Mul, 100.0);
    Ok(shares.into_values())
}

pub fn region_share_case(sales_per_region: usize) -> IdiomCase<Table> {
    IdiomCase::new(
        "region_share",
        "each sale as a share of its region total: per-row lookup vs broadcast division",
        FLOAT_TOLERANCE,
        move || regional_sales(sales_per_region).map_err(|err| err.to_string()),
        |table| finish(region_share_rowwise(&table).map(Output::Floats)),
    )
    .candidate("broadcast_division", |table| {
        finish(region_share_broadcast(&table).map(Output::Floats))
    })
}
