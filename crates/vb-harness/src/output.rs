use vb_frame::Table;
use vb_ufunc::NumArray;

/// Value returned by every implementation of an idiom case.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Int(i128),
    Float(f64),
    Text(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    /// Key/count pairs in whatever order the implementation produced them.
    Counts(Vec<(String, u64)>),
    Array(NumArray),
    Table(Table),
}

impl Output {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Ints(_) => "ints",
            Self::Floats(_) => "floats",
            Self::Counts(_) => "counts",
            Self::Array(_) => "array",
            Self::Table(_) => "table",
        }
    }

    /// Number of top-level elements: 1 for scalars, rows for tables.
    #[must_use]
    pub fn element_count(&self) -> usize {
        match self {
            Self::Int(_) | Self::Float(_) | Self::Text(_) => 1,
            Self::Ints(v) => v.len(),
            Self::Floats(v) => v.len(),
            Self::Counts(v) => v.len(),
            Self::Array(a) => a.len(),
            Self::Table(t) => t.n_rows(),
        }
    }
}

impl From<Table> for Output {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<NumArray> for Output {
    fn from(array: NumArray) -> Self {
        Self::Array(array)
    }
}
