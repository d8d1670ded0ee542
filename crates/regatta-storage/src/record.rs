use regatta_common::types::Value;
use serde::{Deserialize, Serialize};

use crate::Schema;

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn from_slice(values: &[Value]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }

    /// An all-NULL row of the given width.
    pub fn nulls(width: usize) -> Self {
        Self {
            values: vec![Value::Null; width],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name<'a>(&'a self, schema: &Schema, column: &str) -> Option<&'a Value> {
        schema
            .field_index(column)
            .and_then(|idx| self.values.get(idx))
    }
}

impl std::ops::Index<usize> for Record {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}
