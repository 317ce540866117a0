//! Value conversion into scan destinations.
//!
//! Every destination type implements [`ScanDest`] by matching on the source
//! [`Value`] kind. Pairs not listed in a match arm fail closed with
//! [`ConvertErrorKind::Unsupported`]; nothing is ever silently zeroed.
//!
//! | source \ dest | String | `Vec<u8>` | bool | integers | floats | `DateTime<Utc>` |
//! |---------------|--------|-----------|------|----------|--------|-----------------|
//! | Bool          | text   | text      | yes  |          |        |                 |
//! | Int           | text   | text      | 0/1  | checked  | yes    |                 |
//! | Float         | text   | text      |      | integral | yes    |                 |
//! | Text / Bytes  | yes    | yes       | parse| parse    | parse  | parse           |
//! | Timestamp     | RFC3339| RFC3339   |      |          |        | yes             |
//!
//! `Null` only converts into `Value` and `Option<T>`.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::core::error::{Error, Result};
use crate::core::value::{format_timestamp, Value};

/// Why a single value could not be converted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertErrorKind {
    #[error("unsupported conversion")]
    Unsupported,
    #[error("value out of range")]
    OutOfRange,
    #[error("invalid syntax: {0}")]
    Parse(String),
}

/// A failed assignment of one column to its destination.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("sql: Scan error on column index {column}, converting {} {value} to {dest}: {kind}", .value.kind())]
pub struct ConversionError {
    pub column: usize,
    pub dest: &'static str,
    pub value: Value,
    pub kind: ConvertErrorKind,
}

/// A caller-owned slot a scanned column is written into.
pub trait ScanDest {
    /// Name of the destination type, reported in conversion errors.
    fn type_name(&self) -> &'static str;

    /// Converts `src` and writes it into `self`. On failure `self` is left
    /// untouched.
    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind>;
}

/// Builds the destination slice for `scan` from mutable places.
///
/// ```
/// use qdb::{dests, ScanDest};
/// let (mut name, mut age) = (String::new(), 0i32);
/// let slots: &mut [&mut dyn ScanDest] = dests![name, age];
/// assert_eq!(slots.len(), 2);
/// ```
#[macro_export]
macro_rules! dests {
    ($($d:expr),* $(,)?) => {
        &mut [$(&mut $d as &mut dyn $crate::ScanDest),*]
    };
}

/// Assigns `values` into `dest` left to right.
///
/// Stops at the first failing column. Slots before it keep what was written
/// into them; the scan as a whole reports the failure.
pub fn assign_row(values: &[Value], dest: &mut [&mut dyn ScanDest]) -> Result<()> {
    if values.len() != dest.len() {
        return Err(Error::ColumnCount {
            expected: values.len(),
            got: dest.len(),
        });
    }

    for (column, (slot, value)) in dest.iter_mut().zip(values).enumerate() {
        slot.assign(value).map_err(|kind| ConversionError {
            column,
            dest: slot.type_name(),
            value: value.clone(),
            kind,
        })?;
    }
    Ok(())
}

fn text_of(src: &Value) -> std::result::Result<&str, ConvertErrorKind> {
    match src {
        Value::Text(s) => Ok(s),
        Value::Bytes(b) => std::str::from_utf8(b)
            .map_err(|e| ConvertErrorKind::Parse(e.to_string())),
        _ => Err(ConvertErrorKind::Unsupported),
    }
}

fn to_text(src: &Value) -> std::result::Result<String, ConvertErrorKind> {
    match src {
        Value::Text(_) | Value::Bytes(_) => text_of(src).map(str::to_string),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Timestamp(ts) => Ok(format_timestamp(ts)),
        Value::Null => Err(ConvertErrorKind::Unsupported),
    }
}

fn to_bytes(src: &Value) -> std::result::Result<Vec<u8>, ConvertErrorKind> {
    match src {
        Value::Bytes(b) => Ok(b.clone()),
        _ => to_text(src).map(String::into_bytes),
    }
}

fn parse_bool(s: &str) -> std::result::Result<bool, ConvertErrorKind> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ConvertErrorKind::Parse(format!("{s:?} is not a boolean"))),
    }
}

fn to_bool(src: &Value) -> std::result::Result<bool, ConvertErrorKind> {
    match src {
        Value::Bool(b) => Ok(*b),
        Value::Int(0) => Ok(false),
        Value::Int(1) => Ok(true),
        Value::Int(_) => Err(ConvertErrorKind::OutOfRange),
        Value::Text(_) | Value::Bytes(_) => parse_bool(text_of(src)?),
        _ => Err(ConvertErrorKind::Unsupported),
    }
}

fn to_i128(src: &Value) -> std::result::Result<i128, ConvertErrorKind> {
    match src {
        Value::Int(i) => Ok(i128::from(*i)),
        Value::Float(f) => {
            if f.fract() != 0.0 || !f.is_finite() {
                return Err(ConvertErrorKind::Parse(format!("{f} is not an integer")));
            }
            if *f < i128::MIN as f64 || *f > i128::MAX as f64 {
                return Err(ConvertErrorKind::OutOfRange);
            }
            Ok(*f as i128)
        }
        Value::Text(_) | Value::Bytes(_) => {
            let s = text_of(src)?;
            s.trim()
                .parse::<i128>()
                .map_err(|e| ConvertErrorKind::Parse(format!("{s:?}: {e}")))
        }
        _ => Err(ConvertErrorKind::Unsupported),
    }
}

fn to_f64(src: &Value) -> std::result::Result<f64, ConvertErrorKind> {
    match src {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::Text(_) | Value::Bytes(_) => {
            let s = text_of(src)?;
            s.trim()
                .parse::<f64>()
                .map_err(|e| ConvertErrorKind::Parse(format!("{s:?}: {e}")))
        }
        _ => Err(ConvertErrorKind::Unsupported),
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, ConvertErrorKind> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ConvertErrorKind::Parse(format!("{s:?}: {e}")))
}

fn to_timestamp(src: &Value) -> std::result::Result<DateTime<Utc>, ConvertErrorKind> {
    match src {
        Value::Timestamp(ts) => Ok(*ts),
        Value::Text(_) | Value::Bytes(_) => parse_timestamp(text_of(src)?),
        _ => Err(ConvertErrorKind::Unsupported),
    }
}

impl ScanDest for String {
    fn type_name(&self) -> &'static str {
        "String"
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        *self = to_text(src)?;
        Ok(())
    }
}

impl ScanDest for Vec<u8> {
    fn type_name(&self) -> &'static str {
        "Vec<u8>"
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        *self = to_bytes(src)?;
        Ok(())
    }
}

impl ScanDest for bool {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        *self = to_bool(src)?;
        Ok(())
    }
}

macro_rules! impl_scan_int {
    ($($t:ty),*) => {
        $(
            impl ScanDest for $t {
                fn type_name(&self) -> &'static str {
                    stringify!($t)
                }

                fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
                    let wide = to_i128(src)?;
                    *self = <$t>::try_from(wide).map_err(|_| ConvertErrorKind::OutOfRange)?;
                    Ok(())
                }
            }
        )*
    };
}

impl_scan_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ScanDest for f64 {
    fn type_name(&self) -> &'static str {
        "f64"
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        *self = to_f64(src)?;
        Ok(())
    }
}

impl ScanDest for f32 {
    fn type_name(&self) -> &'static str {
        "f32"
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        let wide = to_f64(src)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(ConvertErrorKind::OutOfRange);
        }
        *self = wide as f32;
        Ok(())
    }
}

impl ScanDest for DateTime<Utc> {
    fn type_name(&self) -> &'static str {
        "DateTime<Utc>"
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        *self = to_timestamp(src)?;
        Ok(())
    }
}

impl ScanDest for Value {
    fn type_name(&self) -> &'static str {
        "Value"
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        *self = src.clone();
        Ok(())
    }
}

impl<T: ScanDest + Default> ScanDest for Option<T> {
    fn type_name(&self) -> &'static str {
        match self {
            Some(inner) => inner.type_name(),
            None => T::default().type_name(),
        }
    }

    fn assign(&mut self, src: &Value) -> std::result::Result<(), ConvertErrorKind> {
        if src.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.assign(src)?;
        *self = Some(inner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;
    use chrono::TimeZone;

    #[test]
    fn test_identical_kinds_pass_through() {
        let (mut s, mut n, mut b, mut f) = (String::new(), 0i64, false, 0.0f64);
        assign_row(&values!["Abby", 20, true, 2.5], dests![s, n, b, f]).unwrap();
        assert_eq!((s.as_str(), n, b, f), ("Abby", 20, true, 2.5));
    }

    #[test]
    fn test_integer_narrowing_is_range_checked() {
        let mut small = 0u8;
        assert!(small.assign(&Value::Int(255)).is_ok());
        assert_eq!(small, 255);
        assert_eq!(small.assign(&Value::Int(256)), Err(ConvertErrorKind::OutOfRange));
        assert_eq!(small.assign(&Value::Int(-1)), Err(ConvertErrorKind::OutOfRange));
        assert_eq!(small, 255, "failed assignment must not touch the slot");

        let mut big = 0u64;
        big.assign(&Value::Text("18446744073709551615".into())).unwrap();
        assert_eq!(big, u64::MAX);
    }

    #[test]
    fn test_float_to_integer_requires_integral_value() {
        let mut n = 0i32;
        n.assign(&Value::Float(3.0)).unwrap();
        assert_eq!(n, 3);
        assert!(matches!(n.assign(&Value::Float(3.5)), Err(ConvertErrorKind::Parse(_))));
    }

    #[test]
    fn test_string_and_bytes() {
        let mut bytes = Vec::new();
        bytes.assign(&Value::Text("hello".into())).unwrap();
        assert_eq!(bytes, b"hello");

        let mut s = String::new();
        s.assign(&Value::Bytes(b"world".to_vec())).unwrap();
        assert_eq!(s, "world");
        assert!(matches!(
            s.assign(&Value::Bytes(vec![0xff, 0xfe])),
            Err(ConvertErrorKind::Parse(_))
        ));

        s.assign(&Value::Int(-7)).unwrap();
        assert_eq!(s, "-7");
    }

    #[test]
    fn test_bool_conversions() {
        let mut b = false;
        b.assign(&Value::Int(1)).unwrap();
        assert!(b);
        b.assign(&Value::Text("F".into())).unwrap();
        assert!(!b);
        assert_eq!(b.assign(&Value::Int(2)), Err(ConvertErrorKind::OutOfRange));
        assert!(matches!(b.assign(&Value::Text("yes".into())), Err(ConvertErrorKind::Parse(_))));
    }

    #[test]
    fn test_timestamp_to_string_uses_rfc3339() {
        let jan_first = Utc.timestamp_opt(1609477200, 0).unwrap();
        let mut s = String::new();
        s.assign(&Value::Timestamp(jan_first)).unwrap();
        assert_eq!(s, "2021-01-01T05:00:00Z");
    }

    #[test]
    fn test_text_to_timestamp() {
        let expected = Utc.timestamp_opt(1609477200, 0).unwrap();
        let mut ts = DateTime::<Utc>::default();
        ts.assign(&Value::Text("2021-01-01T05:00:00Z".into())).unwrap();
        assert_eq!(ts, expected);
        ts.assign(&Value::Text("2021-01-01 05:00:00".into())).unwrap();
        assert_eq!(ts, expected);
        assert_eq!(ts.assign(&Value::Int(1609477200)), Err(ConvertErrorKind::Unsupported));
    }

    #[test]
    fn test_null_fails_closed_except_for_option() {
        let mut s = String::from("keep");
        assert_eq!(s.assign(&Value::Null), Err(ConvertErrorKind::Unsupported));
        assert_eq!(s, "keep");

        let mut maybe: Option<i64> = Some(1);
        maybe.assign(&Value::Null).unwrap();
        assert_eq!(maybe, None);
        maybe.assign(&Value::Int(9)).unwrap();
        assert_eq!(maybe, Some(9));
    }

    #[test]
    fn test_unhandled_pair_is_an_error() {
        let mut n = 0i64;
        assert_eq!(n.assign(&Value::Bool(true)), Err(ConvertErrorKind::Unsupported));
        let mut f = 0.0f64;
        assert_eq!(
            f.assign(&Value::Timestamp(Utc.timestamp_opt(0, 0).unwrap())),
            Err(ConvertErrorKind::Unsupported)
        );
    }

    #[test]
    fn test_assign_row_fails_fast_and_keeps_earlier_slots() {
        let (mut name, mut age, mut flag) = (String::new(), 0i32, false);
        let err = assign_row(&values!["Braden", "old", true], dests![name, age, flag]).unwrap_err();

        match err {
            Error::Conversion(e) => {
                assert_eq!(e.column, 1);
                assert_eq!(e.dest, "i32");
                assert_eq!(e.value, Value::Text("old".into()));
            }
            other => panic!("Expected Conversion error, got {other:?}"),
        }
        assert_eq!(name, "Braden");
        assert_eq!(age, 0);
        assert!(!flag);
    }

    #[test]
    fn test_assign_row_checks_width() {
        let mut only = String::new();
        let err = assign_row(&values!["a", "b"], dests![only]).unwrap_err();
        assert!(matches!(err, Error::ColumnCount { expected: 2, got: 1 }));
    }
}
