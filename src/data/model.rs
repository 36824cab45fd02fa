use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// RawTable – the loaded numeric table
// ---------------------------------------------------------------------------

/// An immutable table of numeric rows sharing one column count.
///
/// Built only through [`RawTable::from_rows`], which rejects empty input, so
/// every table that reaches the extractor has at least one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl RawTable {
    /// Wrap already shape-checked rows. Fails with `NoData` if `rows` is empty.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = match rows.first() {
            Some(first) => first.len(),
            None => return Err(AnalysisError::NoData),
        };
        debug_assert!(rows.iter().all(|r| r.len() == columns));
        Ok(RawTable { rows, columns })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in every row.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Value at `(row, col)`. Callers validate `col` against [`columns`](Self::columns).
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }
}

// ---------------------------------------------------------------------------
// ChannelSpec – how one named channel is derived from the table
// ---------------------------------------------------------------------------

fn default_causal() -> bool {
    true
}

/// Column mapping for one channel: `effect - cause`, or the raw `effect`
/// column when `cause` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(default)]
    pub cause: Option<usize>,
    pub effect: usize,
    /// Identifying column (core or thread id) echoed in anomaly reports.
    #[serde(default)]
    pub id: Option<usize>,
    /// Whether `effect` must never precede `cause`.
    #[serde(default = "default_causal")]
    pub causal: bool,
}

impl ChannelSpec {
    /// A causally ordered `effect - cause` channel.
    pub fn delta(name: impl Into<String>, cause: usize, effect: usize) -> Self {
        ChannelSpec {
            name: name.into(),
            cause: Some(cause),
            effect,
            id: None,
            causal: true,
        }
    }

    /// A channel whose column already holds latency values.
    pub fn value(name: impl Into<String>, column: usize) -> Self {
        ChannelSpec {
            name: name.into(),
            cause: None,
            effect: column,
            id: None,
            causal: false,
        }
    }

    pub fn with_id(mut self, id: usize) -> Self {
        self.id = Some(id);
        self
    }

    /// Summarise the channel but skip the anomaly scan.
    pub fn unchecked(mut self) -> Self {
        self.causal = false;
        self
    }

    /// True when negative samples are causality violations worth reporting.
    pub fn is_checked(&self) -> bool {
        self.causal && self.cause.is_some()
    }

    /// Range-check every referenced column against `columns`.
    pub fn validate(&self, columns: usize) -> Result<()> {
        let referenced = self.cause.into_iter().chain([self.effect]).chain(self.id);
        for column in referenced {
            if column >= columns {
                return Err(AnalysisError::InvalidColumnSpec {
                    channel: self.name.clone(),
                    column,
                    columns,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Channel – derived values, row-aligned with the source table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    /// `values[i]` was derived from table row `i`.
    pub values: Vec<f64>,
}

impl Channel {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AnomalyRecord – one causality violation
// ---------------------------------------------------------------------------

/// A row whose effect timestamp precedes its cause timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub channel: String,
    /// 0-based index into the table rows.
    pub row: usize,
    pub cause: f64,
    pub effect: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<f64>,
}

/// `"<id> <effect>, <cause>"`, or `"<effect>, <cause>"` without an id column.
///
/// Timestamps print in shortest round-trip form with a signed two-digit
/// exponent, so `19.0`, `1e+16` and `1.5e-05` look the same as in the
/// benchmark's own analysis output.
impl fmt::Display for AnomalyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.id {
            write!(f, "{id} ")?;
        }
        write!(f, "{}, {}", float_repr(self.effect), float_repr(self.cause))
    }
}

/// `{:?}` already switches to scientific notation at the same magnitudes
/// (below 1e-4, from 1e16 up); only the exponent spelling differs.
fn float_repr(v: f64) -> String {
    let debug = format!("{v:?}");
    match debug.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => debug,
    }
}
