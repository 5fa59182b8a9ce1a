use serde::{Deserialize, Serialize};

/// One cell of a tabular result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Numeric view of the cell. Never fails: null, blank and non-numeric
    /// text all coerce to 0.
    pub fn as_number(&self) -> f64 {
        let n = match self {
            Cell::Null => 0.0,
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if n.is_finite() {
            n
        } else {
            0.0
        }
    }

    /// Display form used for category labels and slice names.
    pub fn label(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

/// 2^63: every integral `f64` below this magnitude fits an `i64` exactly
const I64_RANGE: f64 = 9_223_372_036_854_775_808.0;

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < I64_RANGE
}

/// Integral values print without a fractional part (`100`, not `100.0`).
/// Magnitudes beyond the `i64` range keep the float rendering.
pub fn format_number(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// JSON number with the same integral/fractional split as [`format_number`].
pub fn number_value(n: f64) -> serde_json::Value {
    if is_integral(n) {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::from(0))
    }
}

static NULL_CELL: Cell = Cell::Null;

/// Rows returned by the query of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    #[serde(rename = "sql", alias = "source_query", default)]
    pub source_query: String,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>, source_query: impl Into<String>) -> Self {
        Self {
            columns,
            rows,
            source_query: source_query.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, col); short rows read as null.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&NULL_CELL)
    }
}
