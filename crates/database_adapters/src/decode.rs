use crate::DatabaseAdapterError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::types::Row as JsonRow;
use postgres_types::{FromSql, Type};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use tokio_postgres::Row;
use uuid::Uuid;

type ColumnDecoder = fn(&Row, usize) -> Result<Value, tokio_postgres::Error>;

/// Convert a driver row into a JSON object keyed by column name.
///
/// A column whose type has no JSON mapping fails the whole row rather than
/// coming back as `null`.
pub fn row_to_json(row: &Row) -> Result<JsonRow, DatabaseAdapterError> {
    let mut out = Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let decode = decoder_for(column.type_()).ok_or_else(|| {
            DatabaseAdapterError::unsupported_column(format!(
                "column '{}' has type {} which cannot be returned as JSON; cast it to text",
                column.name(),
                column.type_()
            ))
        })?;
        let value = decode(row, idx).map_err(|e| {
            DatabaseAdapterError::unexpected(format!(
                "failed to decode column '{}' ({}): {}",
                column.name(),
                column.type_(),
                e
            ))
        })?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decoder_for(ty: &Type) -> Option<ColumnDecoder> {
    let decoder: ColumnDecoder = match *ty {
        Type::BOOL => |row, idx| scalar::<bool>(row, idx, Value::from),
        Type::INT2 => |row, idx| scalar::<i16>(row, idx, Value::from),
        Type::INT4 => |row, idx| scalar::<i32>(row, idx, Value::from),
        Type::INT8 => |row, idx| scalar::<i64>(row, idx, Value::from),
        Type::OID => |row, idx| scalar::<u32>(row, idx, Value::from),
        Type::FLOAT4 => |row, idx| scalar::<f32>(row, idx, |f| Value::from(f as f64)),
        Type::FLOAT8 => |row, idx| scalar::<f64>(row, idx, Value::from),
        // exact decimals go out as strings so no precision is lost
        Type::NUMERIC => |row, idx| scalar::<PgNumeric>(row, idx, |n| Value::String(n.0)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            |row, idx| scalar::<String>(row, idx, Value::String)
        }
        Type::JSON | Type::JSONB => |row, idx| scalar::<Value>(row, idx, |v| v),
        Type::UUID => |row, idx| scalar::<Uuid>(row, idx, |u| Value::String(u.to_string())),
        Type::DATE => |row, idx| scalar::<NaiveDate>(row, idx, |d| Value::String(d.to_string())),
        Type::TIME => |row, idx| scalar::<NaiveTime>(row, idx, |t| Value::String(t.to_string())),
        Type::TIMESTAMP => |row, idx| scalar::<NaiveDateTime>(row, idx, timestamp),
        Type::TIMESTAMPTZ => {
            |row, idx| scalar::<DateTime<Utc>>(row, idx, |ts| Value::String(ts.to_rfc3339()))
        }
        Type::INTERVAL => {
            |row, idx| scalar::<PgInterval>(row, idx, |i| Value::String(i.to_string()))
        }
        Type::BOOL_ARRAY => |row, idx| array::<bool>(row, idx, Value::from),
        Type::INT2_ARRAY => |row, idx| array::<i16>(row, idx, Value::from),
        Type::INT4_ARRAY => |row, idx| array::<i32>(row, idx, Value::from),
        Type::INT8_ARRAY => |row, idx| array::<i64>(row, idx, Value::from),
        Type::FLOAT8_ARRAY => |row, idx| array::<f64>(row, idx, Value::from),
        Type::NUMERIC_ARRAY => |row, idx| array::<PgNumeric>(row, idx, |n| Value::String(n.0)),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY | Type::NAME_ARRAY => {
            |row, idx| array::<String>(row, idx, Value::String)
        }
        Type::UUID_ARRAY => |row, idx| array::<Uuid>(row, idx, |u| Value::String(u.to_string())),
        Type::DATE_ARRAY => {
            |row, idx| array::<NaiveDate>(row, idx, |d| Value::String(d.to_string()))
        }
        Type::TIMESTAMP_ARRAY => |row, idx| array::<NaiveDateTime>(row, idx, timestamp),
        _ => return None,
    };
    Some(decoder)
}

fn scalar<'a, T>(
    row: &'a Row,
    idx: usize,
    to_json: impl Fn(T) -> Value,
) -> Result<Value, tokio_postgres::Error>
where
    T: FromSql<'a>,
{
    Ok(row
        .try_get::<_, Option<T>>(idx)?
        .map(to_json)
        .unwrap_or(Value::Null))
}

// one-dimensional arrays only; the driver rejects anything deeper
fn array<'a, T>(
    row: &'a Row,
    idx: usize,
    to_json: impl Fn(T) -> Value,
) -> Result<Value, tokio_postgres::Error>
where
    T: FromSql<'a>,
{
    Ok(row
        .try_get::<_, Option<Vec<Option<T>>>>(idx)?
        .map(|items| {
            Value::Array(
                items
                    .into_iter()
                    .map(|item| item.map(&to_json).unwrap_or(Value::Null))
                    .collect(),
            )
        })
        .unwrap_or(Value::Null))
}

fn timestamp(ts: NaiveDateTime) -> Value {
    Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Postgres `INTERVAL`, rendered the way `psql` prints it with the default
/// `IntervalStyle`, e.g. `1 year 2 mons 3 days 04:05:06`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgInterval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

impl<'a> FromSql<'a> for PgInterval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() != 16 {
            return Err(format!("interval value has {} bytes, expected 16", raw.len()).into());
        }
        let mut micros = [0u8; 8];
        micros.copy_from_slice(&raw[0..8]);
        let mut days = [0u8; 4];
        days.copy_from_slice(&raw[8..12]);
        let mut months = [0u8; 4];
        months.copy_from_slice(&raw[12..16]);
        Ok(PgInterval {
            months: i32::from_be_bytes(months),
            days: i32::from_be_bytes(days),
            microseconds: i64::from_be_bytes(micros),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

impl fmt::Display for PgInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn unit(n: i64, name: &str) -> String {
            if n == 1 {
                format!("1 {name}")
            } else {
                format!("{n} {name}s")
            }
        }

        let mut parts = Vec::new();
        let years = self.months / 12;
        let months = self.months % 12;
        if years != 0 {
            parts.push(unit(years as i64, "year"));
        }
        if months != 0 {
            parts.push(unit(months as i64, "mon"));
        }
        if self.days != 0 {
            parts.push(unit(self.days as i64, "day"));
        }

        if self.microseconds != 0 || parts.is_empty() {
            let sign = if self.microseconds < 0 { "-" } else { "" };
            let total = self.microseconds.unsigned_abs();
            let hours = total / 3_600_000_000;
            let minutes = total / 60_000_000 % 60;
            let seconds = total / 1_000_000 % 60;
            let fraction = total % 1_000_000;
            let mut clock = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if fraction != 0 {
                let digits = format!("{fraction:06}");
                clock.push('.');
                clock.push_str(digits.trim_end_matches('0'));
            }
            parts.push(clock);
        }

        f.write_str(&parts.join(" "))
    }
}

/// Postgres `NUMERIC` rendered as its exact decimal text.
#[derive(Debug, Clone, PartialEq)]
pub struct PgNumeric(pub String);

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        decode_numeric(raw).map(PgNumeric)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Binary layout: ndigits, weight, sign, dscale (all 16 bit), followed by
/// `ndigits` base-10000 digits. `weight` is the power of 10000 of the first
/// digit.
fn decode_numeric(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    if raw.len() < 8 {
        return Err("numeric value shorter than its header".into());
    }
    let word = |at: usize| u16::from_be_bytes([raw[at], raw[at + 1]]);
    let ndigits = word(0) as usize;
    let weight = word(2) as i16 as i32;
    let sign = word(4);
    let dscale = word(6) as usize;

    if raw.len() != 8 + ndigits * 2 {
        return Err(format!(
            "numeric value has {} bytes, expected {}",
            raw.len(),
            8 + ndigits * 2
        )
        .into());
    }

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid numeric sign 0x{other:04x}").into()),
    }

    let digits: Vec<u16> = (0..ndigits).map(|i| word(8 + i * 2)).collect();
    let digit_at = |group: i32| -> u16 {
        if group < 0 {
            0
        } else {
            digits.get(group as usize).copied().unwrap_or(0)
        }
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for group in 0..=weight {
            if group == 0 {
                out.push_str(&digit_at(group).to_string());
            } else {
                out.push_str(&format!("{:04}", digit_at(group)));
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut group = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit_at(group)));
            group += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}
