use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int64,
    Float32,
    Float64,
    Numeric(Option<(u8, u8)>),
    String(Option<usize>),
    Bytes(Option<usize>),
    Date,
    Time,
    TimeTz,
    DateTime,
    Timestamp,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "BOOL"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::Float32 => write!(f, "FLOAT32"),
            DataType::Float64 => write!(f, "FLOAT64"),
            DataType::Numeric(None) => write!(f, "NUMERIC"),
            DataType::Numeric(Some((p, s))) => write!(f, "NUMERIC({}, {})", p, s),
            DataType::String(None) => write!(f, "STRING"),
            DataType::String(Some(n)) => write!(f, "STRING({})", n),
            DataType::Bytes(None) => write!(f, "BYTES"),
            DataType::Bytes(Some(n)) => write!(f, "BYTES({})", n),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::TimeTz => write!(f, "TIME WITH TIME ZONE"),
            DataType::DateTime => write!(f, "DATETIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

/// Time of day stored as its UTC part plus the originating zone offset.
/// Two values denote the same instant of day when their UTC parts agree,
/// so equality ignores the offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeTzValue {
    pub time: NaiveTime,
    pub offset_seconds: i32,
}

impl TimeTzValue {
    pub fn new(time: NaiveTime, offset_seconds: i32) -> Self {
        Self {
            time,
            offset_seconds,
        }
    }
}

impl PartialEq for TimeTzValue {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Eq for TimeTzValue {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    Numeric(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeTz(TimeTzValue),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<FixedOffset>),
}

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    pub fn float32(v: f32) -> Self {
        Value::Float32(OrderedFloat(v))
    }

    pub fn float64(v: f64) -> Self {
        Value::Float64(OrderedFloat(v))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int64(_) => "INT64",
            Value::Float32(_) => "FLOAT32",
            Value::Float64(_) => "FLOAT64",
            Value::Numeric(_) => "NUMERIC",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::TimeTz(_) => "TIME WITH TIME ZONE",
            Value::DateTime(_) => "DATETIME",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// NULL is a member of every type.
    pub fn matches_type(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Null, _) => true,
            (Value::Bool(_), DataType::Bool) => true,
            (Value::Int64(_), DataType::Int64) => true,
            (Value::Float32(_), DataType::Float32) => true,
            (Value::Float64(_), DataType::Float64) => true,
            (Value::Numeric(_), DataType::Numeric(_)) => true,
            (Value::String(_), DataType::String(_)) => true,
            (Value::Bytes(_), DataType::Bytes(_)) => true,
            (Value::Date(_), DataType::Date) => true,
            (Value::Time(_), DataType::Time) => true,
            (Value::TimeTz(_), DataType::TimeTz) => true,
            (Value::DateTime(_), DataType::DateTime) => true,
            (Value::Timestamp(_), DataType::Timestamp) => true,
            _ => false,
        }
    }
}
