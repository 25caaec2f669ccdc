//! Result normalization from untyped store cells to the typed RaceResult struct

use rusqlite::types::Value;

/// Untyped cell as it comes out of the store
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl RawCell {
    /// Numeric reading of the cell; numeric text is accepted, anything else is None
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            RawCell::Null => return None,
            RawCell::Integer(i) => *i as f64,
            RawCell::Real(r) => *r,
            RawCell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Points reading: any finite number, otherwise 0.0
    pub fn as_points(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }
}

impl From<Value> for RawCell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Blob(_) => RawCell::Null,
            Value::Integer(i) => RawCell::Integer(i),
            Value::Real(r) => RawCell::Real(r),
            Value::Text(s) => RawCell::Text(s),
        }
    }
}

impl From<i64> for RawCell {
    fn from(value: i64) -> Self {
        RawCell::Integer(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Real(value)
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }
}

impl<T: Into<RawCell>> From<Option<T>> for RawCell {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawCell::Null, Into::into)
    }
}

/// Result row before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawResultRow {
    pub driver_id: i64,
    pub constructor_id: i64,
    pub session_id: i64,
    pub position: RawCell,
    pub points: RawCell,
}

/// One participant's outcome in one session
#[derive(Debug, Clone, PartialEq)]
pub struct RaceResult {
    pub driver_id: i64,
    pub constructor_id: i64,
    pub session_id: i64,
    pub position: Option<i64>,
    pub points: f64,
}

impl RaceResult {
    /// Normalize a raw row
    ///
    /// - points: any numeric reading, otherwise 0.0
    /// - position: whole numbers only, otherwise None
    pub fn from_raw(row: RawResultRow) -> Self {
        let position = row
            .position
            .as_number()
            .filter(|p| p.fract() == 0.0)
            .map(|p| p as i64);

        Self {
            driver_id: row.driver_id,
            constructor_id: row.constructor_id,
            session_id: row.session_id,
            position,
            points: row.points.as_points(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.position == Some(1)
    }

    /// Null and zero positions are non-finishers, never podiums
    pub fn is_podium(&self) -> bool {
        matches!(self.position, Some(p) if (1..=3).contains(&p))
    }
}

pub fn normalize_results(rows: Vec<RawResultRow>) -> Vec<RaceResult> {
    rows.into_iter().map(RaceResult::from_raw).collect()
}
