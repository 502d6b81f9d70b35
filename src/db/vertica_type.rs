//! Vertica column types.
//!
//! Vertica announces its own type OIDs in row descriptions, which overlap
//! with unrelated Postgres OIDs (16 is NUMERIC, not BOOL). Values arrive in
//! text format and are decoded here rather than through sqlx's Postgres
//! decoders.

use crate::db::Value;
use sqlx::postgres::PgTypeInfo;
use std::fmt;

/// A Vertica column type, keyed by the OID the server reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticaType {
    Boolean,
    Integer,
    Float,
    Char,
    Varchar,
    LongVarchar,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    IntervalYearMonth,
    Numeric,
    Binary,
    Varbinary,
    LongVarbinary,
    Uuid,
    Unknown(u32),
}

impl VerticaType {
    pub fn from_oid(oid: u32) -> Self {
        match oid {
            5 => Self::Boolean,
            6 => Self::Integer,
            7 => Self::Float,
            8 => Self::Char,
            9 => Self::Varchar,
            10 => Self::Date,
            11 => Self::Time,
            12 => Self::Timestamp,
            13 => Self::TimestampTz,
            14 => Self::Interval,
            15 => Self::TimeTz,
            16 => Self::Numeric,
            17 => Self::Varbinary,
            20 => Self::Uuid,
            114 => Self::IntervalYearMonth,
            115 => Self::LongVarchar,
            116 => Self::LongVarbinary,
            117 => Self::Binary,
            other => Self::Unknown(other),
        }
    }

    /// Type of a column as described by sqlx. Types sqlx knows only by name
    /// carry no OID and are treated as unknown.
    pub fn from_type_info(info: &PgTypeInfo) -> Self {
        info.oid()
            .map(|oid| Self::from_oid(oid.0))
            .unwrap_or(Self::Unknown(0))
    }

    /// Decodes one non-null text-format value.
    ///
    /// NUMERIC stays text so no precision is lost. Temporal and unknown types
    /// are kept as the server rendered them.
    pub fn decode(self, text: &str) -> Result<Value, String> {
        match self {
            Self::Boolean => match text {
                "t" | "true" => Ok(Value::from(true)),
                "f" | "false" => Ok(Value::from(false)),
                other => Err(format!("invalid boolean {other:?}")),
            },
            Self::Integer => text
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| format!("invalid integer {text:?}: {e}")),
            Self::Float => text
                .parse::<f64>()
                .map(Value::from)
                .map_err(|e| format!("invalid float {text:?}: {e}")),
            Self::Binary | Self::Varbinary | Self::LongVarbinary => {
                unescape_binary(text).map(Value::from)
            }
            _ => Ok(Value::from(text)),
        }
    }
}

impl fmt::Display for VerticaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Char => "Char",
            Self::Varchar => "Varchar",
            Self::LongVarchar => "Long Varchar",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::TimeTz => "TimeTz",
            Self::Timestamp => "Timestamp",
            Self::TimestampTz => "TimestampTz",
            Self::Interval => "Interval",
            Self::IntervalYearMonth => "Interval Year to Month",
            Self::Numeric => "Numeric",
            Self::Binary => "Binary",
            Self::Varbinary => "Varbinary",
            Self::LongVarbinary => "Long Varbinary",
            Self::Uuid => "Uuid",
            Self::Unknown(oid) => return write!(f, "Unknown({oid})"),
        };
        f.write_str(name)
    }
}

/// Decodes Vertica's text rendering of binary data: printable bytes as is,
/// `\\` for a backslash and `\ooo` octal escapes for everything else.
fn unescape_binary(text: &str) -> Result<Vec<u8>, String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1..i + 4) {
            _ if bytes.get(i + 1) == Some(&b'\\') => {
                out.push(b'\\');
                i += 2;
            }
            Some(digits) if digits.iter().all(|d| (b'0'..=b'7').contains(d)) => {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                let byte = u8::try_from(value)
                    .map_err(|_| format!("octal escape out of range at byte {i}"))?;
                out.push(byte);
                i += 4;
            }
            _ => return Err(format!("invalid binary escape at byte {i}")),
        }
    }

    Ok(out)
}
