use chrono::{Datelike, NaiveTime, Timelike};
use regatta_common::error::{Error, Result};
use regatta_common::types::{DataType, Value};
use regatta_storage::Field;

use crate::collation::Collation;
use crate::context::ExecContext;
use crate::expr::KeyExpr;
use crate::hash::hash_bytes;

/// Reserved key width for text and byte columns declared without a length.
pub const DEFAULT_TEXT_KEY_LENGTH: usize = 32;

const NUMERIC_KEY_LENGTH: usize = 16;
const MICROS_PER_SECOND: i64 = 1_000_000;
const NANOS_PER_MICRO: u32 = 1_000;

/// Plan-time layout of one key inside the packed key image: the reserved
/// byte length and the normalization applied to non-NULL values.
#[derive(Debug, Clone)]
pub struct KeySpec {
    length: usize,
    kind: KeyKind,
}

#[derive(Debug, Clone)]
enum KeyKind {
    Bool,
    Int64,
    Float32,
    Float64,
    Numeric,
    /// Uncollated text, right-padded with the type's pad byte.
    Text { pad: u8 },
    /// Collated text, transformed through the collation's key generator.
    Collated(Collation),
    Date,
    /// TIME with or without zone; only the UTC part is keyed.
    TimeOfDay,
    /// DATETIME or TIMESTAMP; only the UTC instant is keyed, zones dropped.
    Instant,
}

impl KeySpec {
    /// Compute the key layout for one expression from its plan-time
    /// descriptor. Fails for types that cannot be key-normalized.
    pub fn for_field(field: &Field) -> Result<Self> {
        let (length, kind) = match &field.data_type {
            DataType::Bool => (1, KeyKind::Bool),
            DataType::Int64 => (8, KeyKind::Int64),
            DataType::Float32 => (4, KeyKind::Float32),
            DataType::Float64 => (8, KeyKind::Float64),
            DataType::Numeric(_) => (NUMERIC_KEY_LENGTH, KeyKind::Numeric),
            DataType::String(declared) => {
                let declared = declared.unwrap_or(DEFAULT_TEXT_KEY_LENGTH);
                match &field.collation {
                    Some(tag) => {
                        let collation = Collation::resolve(tag)?;
                        (collation.key_length(declared), KeyKind::Collated(collation))
                    }
                    None => (declared, KeyKind::Text { pad: b' ' }),
                }
            }
            DataType::Bytes(declared) => (
                declared.unwrap_or(DEFAULT_TEXT_KEY_LENGTH),
                KeyKind::Text { pad: 0 },
            ),
            DataType::Date => (4, KeyKind::Date),
            DataType::Time | DataType::TimeTz => (8, KeyKind::TimeOfDay),
            DataType::DateTime | DataType::Timestamp => (8, KeyKind::Instant),
        };
        Ok(Self { length, kind })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Write the normalized image of a non-NULL value into its slot.
    /// The slot arrives zero-filled.
    fn encode(&self, value: &Value, out: &mut [u8]) -> Result<()> {
        match (&self.kind, value) {
            (KeyKind::Bool, Value::Bool(b)) => out[0] = u8::from(*b),
            (KeyKind::Int64, Value::Int64(i)) => out.copy_from_slice(&i.to_le_bytes()),
            (KeyKind::Float32, Value::Float32(f)) => {
                // Zero of either sign keeps the pre-zeroed slot, which is
                // the positive-zero image.
                if f.0 != 0.0 {
                    out.copy_from_slice(&f.0.to_bits().to_le_bytes());
                }
            }
            (KeyKind::Float64, Value::Float64(f)) => {
                if f.0 != 0.0 {
                    out.copy_from_slice(&f.0.to_bits().to_le_bytes());
                }
            }
            (KeyKind::Numeric, Value::Numeric(d)) => {
                // normalize() strips trailing zeroes, so equal values share
                // one mantissa/scale representation.
                out.copy_from_slice(&d.normalize().serialize());
            }
            (KeyKind::Text { pad }, Value::String(s)) => {
                let bytes = s.as_bytes();
                let n = bytes.len().min(out.len());
                out[..n].copy_from_slice(&bytes[..n]);
                out[n..].fill(*pad);
            }
            (KeyKind::Text { pad }, Value::Bytes(b)) => {
                let n = b.len().min(out.len());
                out[..n].copy_from_slice(&b[..n]);
                out[n..].fill(*pad);
            }
            (KeyKind::Collated(collation), Value::String(s)) => {
                collation.string_to_key(s, out);
            }
            (KeyKind::Date, Value::Date(d)) => {
                out.copy_from_slice(&d.num_days_from_ce().to_le_bytes());
            }
            (KeyKind::TimeOfDay, Value::Time(t)) => {
                out.copy_from_slice(&micros_of_day(t).to_le_bytes());
            }
            (KeyKind::TimeOfDay, Value::TimeTz(t)) => {
                out.copy_from_slice(&micros_of_day(&t.time).to_le_bytes());
            }
            (KeyKind::Instant, Value::DateTime(dt)) => {
                out.copy_from_slice(&dt.and_utc().timestamp_micros().to_le_bytes());
            }
            (KeyKind::Instant, Value::Timestamp(ts)) => {
                out.copy_from_slice(&ts.timestamp_micros().to_le_bytes());
            }
            (kind, value) => {
                return Err(Error::type_mismatch(
                    format!("{:?} key", kind),
                    value.type_name(),
                ));
            }
        }
        Ok(())
    }
}

pub fn total_key_length(specs: &[KeySpec]) -> usize {
    specs.iter().map(KeySpec::length).sum()
}

/// Evaluate one stream's key expressions and write the packed key image into
/// `buffer`, returning its hash. The buffer is zero-filled first so NULL
/// keys and padding tails are deterministic; NULL keys leave their slot all
/// zero.
pub fn encode_keys(
    ctx: &ExecContext,
    keys: &[KeyExpr],
    specs: &[KeySpec],
    buffer: &mut [u8],
) -> Result<u32> {
    debug_assert_eq!(keys.len(), specs.len());
    debug_assert_eq!(buffer.len(), total_key_length(specs));

    buffer.fill(0);

    let mut offset = 0;
    for (expr, spec) in keys.iter().zip(specs) {
        let value = expr.evaluate(ctx)?;
        if !value.is_null() {
            spec.encode(&value, &mut buffer[offset..offset + spec.length()])?;
        }
        offset += spec.length();
    }

    Ok(hash_bytes(buffer))
}

fn micros_of_day(t: &NaiveTime) -> i64 {
    i64::from(t.num_seconds_from_midnight()) * MICROS_PER_SECOND
        + i64::from(t.nanosecond() / NANOS_PER_MICRO)
}
