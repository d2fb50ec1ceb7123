use chrono::NaiveDateTime;

use crate::error::CoreError;

/// Storage format for every timestamp column, millisecond resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Accepts stored timestamps with or without a fractional part.
pub const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A normalized value on its way to a column.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a.total_cmp(b).is_eq(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    pub fn text(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |s| Self::Text(s.to_string()))
    }

    pub fn integer(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }

    pub fn decimal(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Decimal)
    }

    pub fn timestamp(value: Option<NaiveDateTime>) -> Self {
        value.map_or(Self::Null, Self::Timestamp)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    fn describe(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Text(s) => format!("text {s:?}"),
            Self::Integer(n) => format!("integer {n}"),
            Self::Decimal(f) => format!("decimal {f}"),
            Self::Boolean(b) => format!("boolean {b}"),
            Self::Timestamp(t) => format!("timestamp {t}"),
        }
    }

    /// Bind this value to a destination column type.
    ///
    /// Text longer than the column is cut to `max_len` characters, decimals
    /// are rounded to the column scale, and a decimal whose integer part does
    /// not fit `precision - scale` digits is rejected.
    pub fn bind(&self, column: &str, ty: ColumnType) -> Result<BoundValue, CoreError> {
        if self.is_null() {
            return Ok(BoundValue::Null);
        }
        match ty {
            ColumnType::Text { max_len } => Ok(BoundValue::Text(truncate_chars(
                column,
                self.render(),
                max_len,
            ))),
            ColumnType::Integer => match self {
                Self::Integer(n) => Ok(BoundValue::Integer(*n)),
                Self::Boolean(b) => Ok(BoundValue::Integer(i64::from(*b))),
                Self::Decimal(f) if f.is_finite() => Ok(BoundValue::Integer(f.round() as i64)),
                Self::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(BoundValue::Integer)
                    .map_err(|_| self.mismatch(column, "integer")),
                _ => Err(self.mismatch(column, "integer")),
            },
            ColumnType::Decimal { precision, scale } => {
                let raw = match self {
                    Self::Decimal(f) => *f,
                    Self::Integer(n) => *n as f64,
                    Self::Text(s) => s
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| self.mismatch(column, "decimal"))?,
                    _ => return Err(self.mismatch(column, "decimal")),
                };
                fit_decimal(column, raw, precision, scale).map(BoundValue::Real)
            }
            ColumnType::Boolean => match self {
                Self::Boolean(b) => Ok(BoundValue::Integer(i64::from(*b))),
                Self::Integer(n) => Ok(BoundValue::Integer(i64::from(*n != 0))),
                _ => Err(self.mismatch(column, "boolean")),
            },
            ColumnType::Timestamp => match self {
                Self::Timestamp(t) => Ok(BoundValue::Text(t.format(TIMESTAMP_FORMAT).to_string())),
                _ => Err(self.mismatch(column, "timestamp")),
            },
        }
    }

    /// Bind a value that identifies a row.
    ///
    /// Same as [`FieldValue::bind`] except that text longer than the column
    /// is rejected with [`CoreError::KeyTooLong`]; a cut key would match a
    /// different row.
    pub fn bind_key(&self, column: &str, ty: ColumnType) -> Result<BoundValue, CoreError> {
        if let (ColumnType::Text { max_len }, false) = (ty, self.is_null()) {
            let rendered = self.render();
            let len = rendered.chars().count();
            if len > max_len {
                return Err(CoreError::KeyTooLong {
                    column: column.to_string(),
                    max_len,
                    len,
                });
            }
            return Ok(BoundValue::Text(rendered));
        }
        self.bind(column, ty)
    }

    fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Decimal(f) => f.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Timestamp(t) => t.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    fn mismatch(&self, column: &str, expected: &'static str) -> CoreError {
        CoreError::TypeMismatch {
            column: column.to_string(),
            expected,
            found: self.describe(),
        }
    }
}

/// Declared type of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text { max_len: usize },
    Integer,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    Timestamp,
}

impl ColumnType {
    pub const fn text(max_len: usize) -> Self {
        Self::Text { max_len }
    }

    pub const fn decimal(precision: u8, scale: u8) -> Self {
        Self::Decimal { precision, scale }
    }
}

/// A value ready to be handed to the database driver.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

fn truncate_chars(column: &str, value: String, max_len: usize) -> String {
    match value.char_indices().nth(max_len) {
        Some((cut, _)) => {
            tracing::debug!(column, max_len, "truncating text value to column length");
            value[..cut].to_string()
        }
        None => value,
    }
}

fn fit_decimal(column: &str, value: f64, precision: u8, scale: u8) -> Result<f64, CoreError> {
    let overflow = || CoreError::DecimalOverflow {
        column: column.to_string(),
        value,
        precision,
        scale,
    };
    if !value.is_finite() {
        return Err(overflow());
    }
    let factor = 10f64.powi(i32::from(scale));
    let rounded = (value * factor).round() / factor;
    let limit = 10f64.powi(i32::from(precision.saturating_sub(scale)));
    if rounded.abs() >= limit {
        return Err(overflow());
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn null_binds_for_any_type() {
        for ty in [
            ColumnType::text(5),
            ColumnType::Integer,
            ColumnType::decimal(6, 2),
            ColumnType::Boolean,
            ColumnType::Timestamp,
        ] {
            assert_eq!(FieldValue::Null.bind("c", ty).unwrap(), BoundValue::Null);
        }
    }

    #[test]
    fn text_is_truncated_on_char_boundary() {
        let v = FieldValue::Text("Prüfstand-Ä1".into());
        let bound = v.bind("HostName", ColumnType::text(4)).unwrap();
        assert_eq!(bound, BoundValue::Text("Prüf".into()));

        let short = FieldValue::Text("PT".into());
        assert_eq!(
            short.bind("HostName", ColumnType::text(4)).unwrap(),
            BoundValue::Text("PT".into())
        );
    }

    #[test]
    fn decimal_rounds_to_scale() {
        let v = FieldValue::Decimal(15.876);
        assert_eq!(
            v.bind("TotalRAMGB", ColumnType::decimal(6, 2)).unwrap(),
            BoundValue::Real(15.88)
        );
        let n = FieldValue::Integer(256);
        assert_eq!(
            n.bind("SizeGB", ColumnType::decimal(10, 2)).unwrap(),
            BoundValue::Real(256.0)
        );
    }

    #[test]
    fn decimal_overflow_is_rejected() {
        let v = FieldValue::Decimal(12_345.0);
        match v.bind("TotalRAMGB", ColumnType::decimal(6, 2)) {
            Err(CoreError::DecimalOverflow { column, precision, scale, .. }) => {
                assert_eq!(column, "TotalRAMGB");
                assert_eq!((precision, scale), (6, 2));
            }
            other => panic!("expected DecimalOverflow, got {other:?}"),
        }
        assert!(FieldValue::Decimal(9_999.99)
            .bind("TotalRAMGB", ColumnType::decimal(6, 2))
            .is_ok());
    }

    #[test]
    fn booleans_bind_as_integers() {
        assert_eq!(
            FieldValue::Boolean(true).bind("DHCPEnabled", ColumnType::Boolean).unwrap(),
            BoundValue::Integer(1)
        );
        assert_eq!(
            FieldValue::Boolean(false).bind("IsApplication", ColumnType::Boolean).unwrap(),
            BoundValue::Integer(0)
        );
    }

    #[test]
    fn timestamps_bind_as_fixed_format_text() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(
            FieldValue::Timestamp(t).bind("BootTime", ColumnType::Timestamp).unwrap(),
            BoundValue::Text("2024-03-01 08:15:00.000".into())
        );
    }

    #[test]
    fn timestamps_keep_milliseconds() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(8, 15, 0, 300)
            .unwrap();
        let BoundValue::Text(text) = FieldValue::Timestamp(t)
            .bind("ScanDate", ColumnType::Timestamp)
            .unwrap()
        else {
            panic!("timestamp should bind as text");
        };
        assert_eq!(text, "2024-03-01 08:15:00.300");
        assert_eq!(NaiveDateTime::parse_from_str(&text, TIMESTAMP_PARSE_FORMAT).unwrap(), t);
        assert!(NaiveDateTime::parse_from_str("2024-03-01 08:15:00", TIMESTAMP_PARSE_FORMAT).is_ok());
    }

    #[test]
    fn over_long_keys_are_rejected_not_cut() {
        let mac = FieldValue::Text("00-00-00-00-00-00-00-E0".into());
        match mac.bind_key("MacAddress", ColumnType::text(20)) {
            Err(CoreError::KeyTooLong { column, max_len, len }) => {
                assert_eq!(column, "MacAddress");
                assert_eq!((max_len, len), (20, 23));
            }
            other => panic!("expected KeyTooLong, got {other:?}"),
        }
        assert_eq!(
            mac.bind_key("MacAddress", ColumnType::text(30)).unwrap(),
            BoundValue::Text("00-00-00-00-00-00-00-E0".into())
        );
        assert_eq!(
            FieldValue::Boolean(true).bind_key("IsApplication", ColumnType::Boolean).unwrap(),
            BoundValue::Integer(1)
        );
        assert_eq!(
            FieldValue::Null.bind_key("DeviceID", ColumnType::text(10)).unwrap(),
            BoundValue::Null
        );
    }

    #[test]
    fn incompatible_values_are_rejected() {
        let err = FieldValue::Text("four".into())
            .bind("CPUCores", ColumnType::Integer)
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { expected: "integer", .. }));
        assert!(FieldValue::Text("x".into())
            .bind("BootTime", ColumnType::Timestamp)
            .is_err());
    }
}
