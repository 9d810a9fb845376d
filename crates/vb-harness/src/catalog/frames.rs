//! Table idioms: per-cell access versus whole-column operations.

use super::{FLOAT_TOLERANCE, INPUT_SEED, IdiomError, finish};
use crate::case::IdiomCase;
use crate::digest::EqualityPolicy;
use vb_frame::{Column, Table, Value};
use vb_random::DeterministicRng;
use vb_ufunc::{BinaryOp, CompareOp, NumArray};

fn f64_cell(table: &Table, row: usize, name: &str) -> Result<f64, IdiomError> {
    Ok(table.get_f64(row, name)?)
}

/// Two uniform `[0, 1)` columns named `value1` and `value2`.
pub fn value_pair_table(rows: usize) -> Result<Table, IdiomError> {
    let mut rng = DeterministicRng::new(INPUT_SEED);
    let value1 = rng.fill_f64(rows);
    let value2 = rng.fill_f64(rows);
    Ok(Table::new(vec![
        ("value1".to_string(), Column::F64(value1)),
        ("value2".to_string(), Column::F64(value2)),
    ])?)
}

pub fn row_arithmetic_per_cell(mut table: Table) -> Result<Table, IdiomError> {
    for row in 0..table.n_rows() {
        let v1 = f64_cell(&table, row, "value1")?;
        let v2 = f64_cell(&table, row, "value2")?;
        table.set_f64(row, "total", v1 + v2)?;
        let v1 = f64_cell(&table, row, "value1")?;
        let v2 = f64_cell(&table, row, "value2")?;
        table.set_f64(row, "average", (v1 + v2) / 2.0)?;
    }
    Ok(table)
}

pub fn row_arithmetic_columnar(table: Table) -> Result<Table, IdiomError> {
    let v1 = table.f64_array("value1")?;
    let v2 = table.f64_array("value2")?;
    let total = v1.elementwise_binary(&v2, BinaryOp::Add)?;
    let average = total.scalar_binary(BinaryOp::Div, 2.0);
    Ok(table
        .with_array_column("total", total)?
        .with_array_column("average", average)?)
}

pub fn row_arithmetic_case(rows: usize) -> IdiomCase<Table> {
    IdiomCase::new(
        "frame_row_arithmetic",
        "derive total and average columns cell by cell vs whole columns",
        FLOAT_TOLERANCE,
        move || value_pair_table(rows).map_err(|err| err.to_string()),
        |table| finish(row_arithmetic_per_cell(table)),
    )
    .candidate("columnar", |table| finish(row_arithmetic_columnar(table)))
}

pub fn threshold_filter_rowwise(table: &Table, threshold: f64) -> Result<Table, IdiomError> {
    let mut kept = Vec::new();
    for row in 0..table.n_rows() {
        let first = f64_cell(table, row, "value1")?;
        let second = f64_cell(table, row, "value2")?;
        if first > threshold && second > threshold {
            kept.push(table.row(row)?);
        }
    }
    Ok(Table::from_rows(&table.schema(), kept)?)
}

pub fn threshold_filter_mask(table: &Table, threshold: f64) -> Result<Table, IdiomError> {
    let above1 = table.f64_array("value1")?.compare_scalar(CompareOp::Gt, threshold);
    let above2 = table.f64_array("value2")?.compare_scalar(CompareOp::Gt, threshold);
    let mask: Vec<bool> = above1.iter().zip(&above2).map(|(&a, &b)| a && b).collect();
    Ok(table.filter(&mask)?)
}

pub fn threshold_filter_case(rows: usize, threshold: f64) -> IdiomCase<Table> {
    IdiomCase::new(
        "threshold_filter",
        "keep rows where both values exceed a threshold: row loop vs boolean mask",
        EqualityPolicy::Exact,
        move || value_pair_table(rows).map_err(|err| err.to_string()),
        move |table| finish(threshold_filter_rowwise(&table, threshold)),
    )
    .candidate("boolean_mask", move |table| {
        finish(threshold_filter_mask(&table, threshold))
    })
}

/// `parts` single-column tables of `rows_per_part` uniform values each.
pub fn concat_parts(parts: usize, rows_per_part: usize) -> Result<Vec<Table>, IdiomError> {
    let mut rng = DeterministicRng::new(INPUT_SEED);
    let mut out = Vec::with_capacity(parts);
    for _ in 0..parts {
        let values = rng.fill_f64(rows_per_part);
        out.push(Table::new(vec![("value".to_string(), Column::F64(values))])?);
    }
    Ok(out)
}

pub fn concat_repeated(parts: &[Table]) -> Result<Table, IdiomError> {
    let mut result = Table::default();
    for part in parts {
        result = result.append(part)?;
    }
    Ok(result)
}

pub fn concat_bulk(parts: &[Table]) -> Result<Table, IdiomError> {
    let refs: Vec<&Table> = parts.iter().collect();
    Ok(Table::concat(&refs)?)
}

pub fn frame_concat_case(parts: usize, rows_per_part: usize) -> IdiomCase<Vec<Table>> {
    IdiomCase::new(
        "frame_concat",
        "concatenate many small tables pairwise in a loop vs once",
        EqualityPolicy::Exact,
        move || concat_parts(parts, rows_per_part).map_err(|err| err.to_string()),
        |parts| finish(concat_repeated(&parts)),
    )
    .candidate("bulk_concat", |parts| finish(concat_bulk(&parts)))
}

/// Product rows with integer quantities and float prices/costs. Quantities
/// start at 1 so revenue is never zero.
pub fn product_table(rows: usize) -> Result<Table, IdiomError> {
    let mut rng = DeterministicRng::new(INPUT_SEED);
    let mut names = Vec::with_capacity(rows);
    let mut quantity = Vec::with_capacity(rows);
    let mut price = Vec::with_capacity(rows);
    let mut cost = Vec::with_capacity(rows);
    for idx in 0..rows {
        names.push(format!("product_{idx}"));
        quantity.push(i64::try_from(rng.bounded_u64(500)? + 1).unwrap_or(1));
        let p = rng.uniform(5.0, 500.0)?;
        price.push(p);
        cost.push(p * rng.uniform(0.3, 0.9)?);
    }
    Ok(Table::new(vec![
        ("product_name".to_string(), Column::Text(names)),
        ("quantity_sold".to_string(), Column::I64(quantity)),
        ("price".to_string(), Column::F64(price)),
        ("cost".to_string(), Column::F64(cost)),
    ])?)
}

pub fn product_metrics_rowwise(mut table: Table) -> Result<Table, IdiomError> {
    for row in 0..table.n_rows() {
        let quantity = match table.get(row, "quantity_sold")? {
            Value::I64(q) => q as f64,
            _ => return Err(IdiomError::CellValue("quantity_sold".to_string())),
        };
        let revenue = quantity * f64_cell(&table, row, "price")?;
        let profit = revenue - quantity * f64_cell(&table, row, "cost")?;
        table.set_f64(row, "revenue", revenue)?;
        table.set_f64(row, "profit", profit)?;
        table.set_f64(row, "profit_margin", profit / revenue * 100.0)?;
    }
    Ok(table)
}

pub fn product_metrics_columnar(table: Table) -> Result<Table, IdiomError> {
    let quantity = NumArray::from_vec(
        table
            .i64_column("quantity_sold")?
            .iter()
            .map(|&q| q as f64)
            .collect(),
    );
    let revenue = quantity.elementwise_binary(&table.f64_array("price")?, BinaryOp::Mul)?;
    let spend = quantity.elementwise_binary(&table.f64_array("cost")?, BinaryOp::Mul)?;
    let profit = revenue.elementwise_binary(&spend, BinaryOp::Sub)?;
    let margin = profit
        .elementwise_binary(&revenue, BinaryOp::Div)?
        .scalar_binary(BinaryOp::Mul, 100.0);
    Ok(table
        .with_array_column("revenue", revenue)?
        .with_array_column("profit", profit)?
        .with_array_column("profit_margin", margin)?)
}

pub fn product_metrics_case(rows: usize) -> IdiomCase<Table> {
    IdiomCase::new(
        "product_metrics",
        "revenue, profit and margin per product: row loop vs columnar arithmetic",
        FLOAT_TOLERANCE,
        move || product_table(rows).map_err(|err| err.to_string()),
        |table| finish(product_metrics_rowwise(table)),
    )
    .candidate("columnar", |table| finish(product_metrics_columnar(table)))
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.') && email.chars().count() > 5
}

/// Customers whose emails are a mix of valid and malformed addresses.
pub fn customer_table(rows: usize) -> Result<Table, IdiomError> {
    let mut rng = DeterministicRng::new(INPUT_SEED);
    let mut ids = Vec::with_capacity(rows);
    let mut emails = Vec::with_capacity(rows);
    let mut ages = Vec::with_capacity(rows);
    for idx in 0..rows {
        ids.push(i64::try_from(idx).unwrap_or(i64::MAX));
        let email = match rng.bounded_u64(6)? {
            0 => format!("user{idx}example.com"),
            1 => format!("user{idx}@example"),
            2 => "a@b.c".to_string(),
            _ => format!("user{idx}@example.com"),
        };
        emails.push(email);
        ages.push(i64::try_from(rng.bounded_u64(62)? + 18).unwrap_or(18));
    }
    Ok(Table::new(vec![
        ("customer_id".to_string(), Column::I64(ids)),
        ("email".to_string(), Column::Text(emails)),
        ("age".to_string(), Column::I64(ages)),
    ])?)
}

pub fn email_validation_rowwise(table: &Table) -> Result<Table, IdiomError> {
    let mut valid = Vec::new();
    for row in 0..table.n_rows() {
        let Value::Text(email) = table.get(row, "email")? else {
            return Err(IdiomError::CellValue("email".to_string()));
        };
        if is_valid_email(&email) {
            valid.push(table.row(row)?);
        }
    }
    Ok(Table::from_rows(&table.schema(), valid)?)
}

pub fn email_validation_mask(table: &Table) -> Result<Table, IdiomError> {
    let mask: Vec<bool> = table
        .text_column("email")?
        .iter()
        .map(|email| is_valid_email(email))
        .collect();
    Ok(table.filter(&mask)?)
}

pub fn email_validation_case(rows: usize) -> IdiomCase<Table> {
    IdiomCase::new(
        "email_validation",
        "drop customers with malformed emails: rebuild row by row vs column mask",
        EqualityPolicy::Exact,
        move || customer_table(rows).map_err(|err| err.to_string()),
        |table| finish(email_validation_rowwise(&table)),
    )
    .candidate("column_mask", |table| finish(email_validation_mask(&table)))
}

#[cfg(test)]
mod tests {
    use super::{
        concat_bulk, concat_parts, concat_repeated, customer_table, email_validation_mask,
        email_validation_rowwise, is_valid_email, product_metrics_columnar,
        product_metrics_rowwise, product_table, row_arithmetic_columnar, row_arithmetic_per_cell,
        threshold_filter_mask, threshold_filter_rowwise, value_pair_table,
    };
    use vb_frame::{Column, Table};

    #[test]
    fn row_arithmetic_paths_agree() {
        let table = value_pair_table(50).expect("input");
        let slow = row_arithmetic_per_cell(table.clone()).expect("slow");
        let fast = row_arithmetic_columnar(table).expect("fast");
        assert_eq!(slow.column_names(), fast.column_names());
        assert_eq!(
            slow.f64_column("average").expect("average"),
            fast.f64_column("average").expect("average")
        );
        let v1 = fast.get_f64(7, "value1").expect("cell");
        let v2 = fast.get_f64(7, "value2").expect("cell");
        assert_eq!(fast.get_f64(7, "total").expect("total"), v1 + v2);
    }

    #[test]
    fn threshold_filter_keeps_the_same_rows() {
        let table = value_pair_table(300).expect("input");
        let slow = threshold_filter_rowwise(&table, 0.5).expect("slow");
        let fast = threshold_filter_mask(&table, 0.5).expect("fast");
        assert_eq!(slow, fast);
        assert!(slow.n_rows() > 0 && slow.n_rows() < 300);
        assert!(
            slow.f64_column("value1")
                .expect("value1")
                .iter()
                .all(|&v| v > 0.5)
        );
    }

    #[test]
    fn threshold_filter_on_empty_result_keeps_schema() {
        let table = value_pair_table(20).expect("input");
        let slow = threshold_filter_rowwise(&table, 2.0).expect("slow");
        let fast = threshold_filter_mask(&table, 2.0).expect("fast");
        assert_eq!(slow.n_rows(), 0);
        assert_eq!(slow, fast);
    }

    #[test]
    fn concatenation_paths_agree() {
        let parts = concat_parts(7, 5).expect("parts");
        let slow = concat_repeated(&parts).expect("slow");
        let fast = concat_bulk(&parts).expect("fast");
        assert_eq!(slow.n_rows(), 35);
        assert_eq!(slow, fast);
        assert_eq!(concat_bulk(&[]).expect("empty"), Table::default());
    }

    #[test]
    fn product_metrics_match_hand_computation() {
        let table = Table::new(vec![
            ("product_name".to_string(), Column::Text(vec!["p".to_string()])),
            ("quantity_sold".to_string(), Column::I64(vec![4])),
            ("price".to_string(), Column::F64(vec![10.0])),
            ("cost".to_string(), Column::F64(vec![7.5])),
        ])
        .expect("table");
        let fast = product_metrics_columnar(table.clone()).expect("fast");
        assert_eq!(fast.get_f64(0, "revenue").expect("revenue"), 40.0);
        assert_eq!(fast.get_f64(0, "profit").expect("profit"), 10.0);
        assert_eq!(fast.get_f64(0, "profit_margin").expect("margin"), 25.0);
        assert_eq!(product_metrics_rowwise(table).expect("slow"), fast);
    }

    #[test]
    fn generated_products_have_positive_quantities() {
        let table = product_table(100).expect("products");
        assert!(table.i64_column("quantity_sold").expect("q").iter().all(|&q| q >= 1));
        let slow = product_metrics_rowwise(table.clone()).expect("slow");
        let fast = product_metrics_columnar(table).expect("fast");
        assert_eq!(slow.column_names(), fast.column_names());
    }

    #[test]
    fn email_rules() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("a@b.c"));
        assert!(is_valid_email("ab@c.d"));
    }

    #[test]
    fn email_validation_paths_agree() {
        let table = customer_table(120).expect("customers");
        let slow = email_validation_rowwise(&table).expect("slow");
        let fast = email_validation_mask(&table).expect("fast");
        assert_eq!(slow, fast);
        assert!(fast.n_rows() < table.n_rows());
        assert!(
            fast.text_column("email")
                .expect("email")
                .iter()
                .all(|e| is_valid_email(e))
        );
    }
}
