use crate::output::Output;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use vb_frame::{Column, Table};

/// How two outputs of the same case are judged equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EqualityPolicy {
    /// Byte-identical canonical encoding.
    Exact,
    /// Same multiset of elements (or rows); order is ignored.
    Structural,
    /// Identical layout; floats within `abs_tol + rel_tol * |expected|`.
    Tolerance { abs_tol: f64, rel_tol: f64 },
}

impl EqualityPolicy {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Exact => "exact".to_string(),
            Self::Structural => "structural".to_string(),
            Self::Tolerance { abs_tol, rel_tol } => {
                format!("tolerance(abs={abs_tol:e}, rel={rel_tol:e})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDigest {
    pub kind: &'static str,
    /// Hash of the whole output (exact), of the sorted elements
    /// (structural), or of the non-float layout (tolerance).
    pub sha256: String,
    pub element_count: usize,
    #[serde(skip)]
    pub numeric: Vec<f64>,
}

#[must_use]
pub fn digest_output(output: &Output, policy: EqualityPolicy) -> OutputDigest {
    let mut canon = Canonical::new(matches!(policy, EqualityPolicy::Tolerance { .. }));
    canon.visit(output);
    if matches!(policy, EqualityPolicy::Structural) {
        canon.items.sort_unstable();
    }

    let mut hasher = Sha256::new();
    hasher.update(&canon.header);
    for item in &canon.items {
        hasher.update((item.len() as u64).to_le_bytes());
        hasher.update(item);
    }

    OutputDigest {
        kind: output.kind(),
        sha256: hex(&hasher.finalize()),
        element_count: output.element_count(),
        numeric: canon.numeric,
    }
}

/// `Ok(())` when `actual` is equivalent to `expected` under `policy`,
/// otherwise a human-readable reason.
pub fn compare_digests(
    expected: &OutputDigest,
    actual: &OutputDigest,
    policy: EqualityPolicy,
) -> Result<(), String> {
    if expected.kind != actual.kind {
        return Err(format!(
            "output kind mismatch expected={} actual={}",
            expected.kind, actual.kind
        ));
    }
    if expected.element_count != actual.element_count {
        return Err(format!(
            "element count mismatch expected={} actual={}",
            expected.element_count, actual.element_count
        ));
    }
    if expected.sha256 != actual.sha256 {
        let what = match policy {
            EqualityPolicy::Tolerance { .. } => "layout",
            _ => "content",
        };
        return Err(format!(
            "{what} digest mismatch expected={} actual={}",
            expected.sha256, actual.sha256
        ));
    }
    if let EqualityPolicy::Tolerance { abs_tol, rel_tol } = policy {
        compare_values(&expected.numeric, &actual.numeric, abs_tol, rel_tol)?;
    }
    Ok(())
}

fn compare_values(
    expected_values: &[f64],
    actual_values: &[f64],
    abs_tol: f64,
    rel_tol: f64,
) -> Result<(), String> {
    if expected_values.len() != actual_values.len() {
        return Err(format!(
            "value length mismatch expected={} actual={}",
            expected_values.len(),
            actual_values.len()
        ));
    }

    for (idx, (&expected, &actual)) in expected_values.iter().zip(actual_values).enumerate() {
        if expected.is_nan() && actual.is_nan() {
            continue;
        }
        if expected.is_infinite() || actual.is_infinite() {
            if expected != actual {
                return Err(format!(
                    "value mismatch at index {idx}: expected={expected} actual={actual}"
                ));
            }
            continue;
        }

        let abs_err = (expected - actual).abs();
        let threshold = abs_tol + rel_tol * expected.abs();
        // NaN on one side only also lands here: NaN > x is false, so test the negation.
        if !(abs_err <= threshold) {
            return Err(format!(
                "value mismatch at index {idx}: expected={expected} actual={actual} \
                 abs_err={abs_err} threshold={threshold}"
            ));
        }
    }

    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// Canonical byte encoding: a header describing the layout plus one byte
/// string per element. When `split_floats` is set, floats are moved into
/// `numeric` and only a marker remains in the bytes.
struct Canonical {
    split_floats: bool,
    header: Vec<u8>,
    items: Vec<Vec<u8>>,
    numeric: Vec<f64>,
}

impl Canonical {
    fn new(split_floats: bool) -> Self {
        Self {
            split_floats,
            header: Vec::new(),
            items: Vec::new(),
            numeric: Vec::new(),
        }
    }

    fn visit(&mut self, output: &Output) {
        put_str(&mut self.header, output.kind());
        match output {
            Output::Int(v) => self.items.push(v.to_le_bytes().to_vec()),
            Output::Float(v) => {
                let mut item = Vec::new();
                self.put_f64(&mut item, *v);
                self.items.push(item);
            }
            Output::Text(s) => {
                let mut item = Vec::new();
                put_str(&mut item, s);
                self.items.push(item);
            }
            Output::Ints(values) => {
                self.items
                    .extend(values.iter().map(|v| v.to_le_bytes().to_vec()));
            }
            Output::Floats(values) => self.push_floats(values),
            Output::Counts(pairs) => {
                for (key, count) in pairs {
                    let mut item = Vec::new();
                    put_str(&mut item, key);
                    item.extend_from_slice(&count.to_le_bytes());
                    self.items.push(item);
                }
            }
            Output::Array(array) => {
                for &dim in array.shape() {
                    self.header.extend_from_slice(&(dim as u64).to_le_bytes());
                }
                self.push_floats(array.values());
            }
            Output::Table(table) => self.visit_table(table),
        }
    }

    fn push_floats(&mut self, values: &[f64]) {
        for &v in values {
            let mut item = Vec::with_capacity(8);
            self.put_f64(&mut item, v);
            self.items.push(item);
        }
    }

    fn visit_table(&mut self, table: &Table) {
        for (name, kind) in table.schema() {
            put_str(&mut self.header, &name);
            put_str(&mut self.header, kind.as_str());
        }
        for row in 0..table.n_rows() {
            let mut item = Vec::new();
            for column in table.columns() {
                match column {
                    Column::F64(v) => self.put_f64(&mut item, v[row]),
                    Column::I64(v) => item.extend_from_slice(&v[row].to_le_bytes()),
                    Column::Text(v) => put_str(&mut item, &v[row]),
                }
            }
            self.items.push(item);
        }
    }

    fn put_f64(&mut self, buf: &mut Vec<u8>, value: f64) {
        if self.split_floats {
            self.numeric.push(value);
            buf.push(b'f');
        } else {
            let bits = if value.is_nan() {
                f64::NAN.to_bits()
            } else {
                value.to_bits()
            };
            buf.extend_from_slice(&bits.to_le_bytes());
        }
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}
