#![forbid(unsafe_code)]

//! Minimal in-memory columnar table.
//!
//! Cell accessors (`get`, `set_f64`, `row`) resolve the column by name on
//! every call and are the row-at-a-time path. Column accessors hand out whole
//! slices or [`NumArray`]s and are the vectorized path.

use thiserror::Error;
use vb_ufunc::NumArray;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    F64,
    I64,
    Text,
}

impl ColumnKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::I64 => "i64",
            Self::Text => "text",
        }
    }

    #[must_use]
    pub fn empty_column(self) -> Column {
        match self {
            Self::F64 => Column::F64(Vec::new()),
            Self::I64 => Column::I64(Vec::new()),
            Self::Text => Column::Text(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    F64(f64),
    I64(i64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::F64(_) => ColumnKind::F64,
            Self::I64(_) => ColumnKind::I64,
            Self::Text(_) => ColumnKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    F64(Vec<f64>),
    I64(Vec<i64>),
    Text(Vec<String>),
}

impl Column {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::F64(_) => ColumnKind::F64,
            Self::I64(_) => ColumnKind::I64,
            Self::Text(_) => ColumnKind::Text,
        }
    }

    #[must_use]
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Self::F64(v) => v.get(row).copied().map(Value::F64),
            Self::I64(v) => v.get(row).copied().map(Value::I64),
            Self::Text(v) => v.get(row).cloned().map(Value::Text),
        }
    }

    fn push(&mut self, value: Value) -> Result<(), ColumnKind> {
        match (self, value) {
            (Self::F64(v), Value::F64(x)) => v.push(x),
            (Self::I64(v), Value::I64(x)) => v.push(x),
            (Self::Text(v), Value::Text(x)) => v.push(x),
            (_, other) => return Err(other.kind()),
        }
        Ok(())
    }

    fn extend_from(&mut self, other: &Self) -> Result<(), ColumnKind> {
        match (self, other) {
            (Self::F64(v), Self::F64(o)) => v.extend_from_slice(o),
            (Self::I64(v), Self::I64(o)) => v.extend_from_slice(o),
            (Self::Text(v), Self::Text(o)) => v.extend(o.iter().cloned()),
            (_, other) => return Err(other.kind()),
        }
        Ok(())
    }

    fn filter(&self, mask: &[bool]) -> Self {
        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter_map(|(v, &k)| k.then(|| v.clone()))
                .collect()
        }
        match self {
            Self::F64(v) => Self::F64(keep(v, mask)),
            Self::I64(v) => Self::I64(keep(v, mask)),
            Self::Text(v) => Self::Text(keep(v, mask)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("column '{column}' holds {actual} values, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("row {row} out of bounds for {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },
    #[error("row has {actual} cells, schema has {expected} columns")]
    RowWidth { expected: usize, actual: usize },
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl FrameError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::UnknownColumn(_) => "frame_unknown_column",
            Self::DuplicateColumn(_) => "frame_duplicate_column",
            Self::LengthMismatch { .. } => "frame_length_mismatch",
            Self::TypeMismatch { .. } => "frame_type_mismatch",
            Self::RowOutOfBounds { .. } => "frame_row_out_of_bounds",
            Self::RowWidth { .. } => "frame_row_width_mismatch",
            Self::SchemaMismatch(_) => "frame_schema_mismatch",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self, FrameError> {
        let mut table = Self::default();
        for (name, column) in columns {
            if table.position(&name).is_some() {
                return Err(FrameError::DuplicateColumn(name));
            }
            if let Some(first) = table.columns.first()
                && first.len() != column.len()
            {
                return Err(FrameError::LengthMismatch {
                    column: name,
                    expected: first.len(),
                    actual: column.len(),
                });
            }
            table.names.push(name);
            table.columns.push(column);
        }
        Ok(table)
    }

    /// Builds a table from row tuples under an explicit schema, so that an
    /// empty row set still yields the right columns.
    pub fn from_rows(
        schema: &[(String, ColumnKind)],
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, FrameError> {
        let mut columns: Vec<Column> = schema.iter().map(|(_, k)| k.empty_column()).collect();
        for row in rows {
            if row.len() != schema.len() {
                return Err(FrameError::RowWidth {
                    expected: schema.len(),
                    actual: row.len(),
                });
            }
            for ((column, value), (name, kind)) in columns.iter_mut().zip(row).zip(schema) {
                column.push(value).map_err(|actual| FrameError::TypeMismatch {
                    column: name.clone(),
                    expected: kind.as_str(),
                    actual: actual.as_str(),
                })?;
            }
        }
        Ok(Self {
            names: schema.iter().map(|(n, _)| n.clone()).collect(),
            columns,
        })
    }

    #[must_use]
    pub fn schema(&self) -> Vec<(String, ColumnKind)> {
        self.names
            .iter()
            .cloned()
            .zip(self.columns.iter().map(Column::kind))
            .collect()
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, FrameError> {
        self.position(name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))
    }

    pub fn f64_column(&self, name: &str) -> Result<&[f64], FrameError> {
        match self.column(name)? {
            Column::F64(values) => Ok(values),
            other => Err(type_mismatch(name, ColumnKind::F64, other.kind())),
        }
    }

    pub fn i64_column(&self, name: &str) -> Result<&[i64], FrameError> {
        match self.column(name)? {
            Column::I64(values) => Ok(values),
            other => Err(type_mismatch(name, ColumnKind::I64, other.kind())),
        }
    }

    pub fn text_column(&self, name: &str) -> Result<&[String], FrameError> {
        match self.column(name)? {
            Column::Text(values) => Ok(values),
            other => Err(type_mismatch(name, ColumnKind::Text, other.kind())),
        }
    }

    /// Copies an f64 column into a 1-D array.
    pub fn f64_array(&self, name: &str) -> Result<NumArray, FrameError> {
        Ok(NumArray::from_vec(self.f64_column(name)?.to_vec()))
    }

    /// Replaces the named column, or appends it when absent.
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self, FrameError> {
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(FrameError::LengthMismatch {
                column: name.to_string(),
                expected: self.n_rows(),
                actual: column.len(),
            });
        }
        match self.position(name) {
            Some(idx) => self.columns[idx] = column,
            None => {
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
        Ok(self)
    }

    pub fn with_array_column(self, name: &str, values: NumArray) -> Result<Self, FrameError> {
        self.with_column(name, Column::F64(values.into_values()))
    }

    pub fn get(&self, row: usize, name: &str) -> Result<Value, FrameError> {
        let rows = self.n_rows();
        self.column(name)?
            .get(row)
            .ok_or(FrameError::RowOutOfBounds { row, rows })
    }

    pub fn get_f64(&self, row: usize, name: &str) -> Result<f64, FrameError> {
        let rows = self.n_rows();
        self.f64_column(name)?
            .get(row)
            .copied()
            .ok_or(FrameError::RowOutOfBounds { row, rows })
    }

    /// Writes one cell. A missing column is created NaN-filled first.
    pub fn set_f64(&mut self, row: usize, name: &str, value: f64) -> Result<(), FrameError> {
        let rows = self.n_rows();
        if row >= rows {
            return Err(FrameError::RowOutOfBounds { row, rows });
        }
        let idx = match self.position(name) {
            Some(idx) => idx,
            None => {
                self.names.push(name.to_string());
                self.columns.push(Column::F64(vec![f64::NAN; rows]));
                self.columns.len() - 1
            }
        };
        match &mut self.columns[idx] {
            Column::F64(values) => {
                values[row] = value;
                Ok(())
            }
            other => Err(type_mismatch(name, ColumnKind::F64, other.kind())),
        }
    }

    pub fn row(&self, row: usize) -> Result<Vec<Value>, FrameError> {
        let rows = self.n_rows();
        if row >= rows {
            return Err(FrameError::RowOutOfBounds { row, rows });
        }
        Ok(self
            .columns
            .iter()
            .filter_map(|column| column.get(row))
            .collect())
    }

    pub fn filter(&self, mask: &[bool]) -> Result<Self, FrameError> {
        if mask.len() != self.n_rows() {
            return Err(FrameError::LengthMismatch {
                column: "<mask>".to_string(),
                expected: self.n_rows(),
                actual: mask.len(),
            });
        }
        Ok(Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.filter(mask)).collect(),
        })
    }

    /// Returns a new table holding `self` followed by `other`. A table with no
    /// columns acts as the identity.
    pub fn append(&self, other: &Self) -> Result<Self, FrameError> {
        Self::concat(&[self, other])
    }

    pub fn concat(tables: &[&Self]) -> Result<Self, FrameError> {
        let mut parts = tables.iter().filter(|t| t.n_cols() > 0);
        let Some(first) = parts.next() else {
            return Ok(Self::default());
        };
        let mut out = (**first).clone();
        for part in parts {
            if part.names != out.names {
                return Err(FrameError::SchemaMismatch(format!(
                    "expected columns {:?}, got {:?}",
                    out.names, part.names
                )));
            }
            for ((dst, src), name) in out.columns.iter_mut().zip(&part.columns).zip(&part.names) {
                let expected = dst.kind();
                dst.extend_from(src).map_err(|actual| FrameError::TypeMismatch {
                    column: name.clone(),
                    expected: expected.as_str(),
                    actual: actual.as_str(),
                })?;
            }
        }
        Ok(out)
    }
}

fn type_mismatch(name: &str, expected: ColumnKind, actual: ColumnKind) -> FrameError {
    FrameError::TypeMismatch {
        column: name.to_string(),
        expected: expected.as_str(),
        actual: actual.as_str(),
    }
}
