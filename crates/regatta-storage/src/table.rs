use regatta_common::error::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::{Record, Schema};

/// In-memory row store. Rows keep insertion order, which is the order a
/// full scan produces them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    schema: Schema,
    records: Vec<Record>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    pub fn empty(schema: Schema) -> Self {
        Self::new(schema)
    }

    pub fn from_records(schema: Schema, records: Vec<Record>) -> Result<Self> {
        let mut table = Self::new(schema);
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, record: Record) -> Result<()> {
        if record.len() != self.schema.num_fields() {
            return Err(Error::internal(format!(
                "record width {} does not match schema width {}",
                record.len(),
                self.schema.num_fields()
            )));
        }
        for (value, field) in record.values().iter().zip(self.schema.fields()) {
            if !value.matches_type(&field.data_type) {
                return Err(Error::type_mismatch(
                    field.data_type.to_string(),
                    value.type_name(),
                ));
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use regatta_common::types::{DataType, Value};

    use super::*;
    use crate::Field;

    fn test_schema() -> Schema {
        Schema::from_fields(vec![
            Field::nullable("id", DataType::Int64),
            Field::nullable("name", DataType::String(None)),
        ])
    }

    #[test]
    fn test_insert_and_read() {
        let mut table = Table::new(test_schema());
        table
            .insert(Record::from_values(vec![
                Value::Int64(1),
                Value::String("a".to_string()),
            ]))
            .unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.record(0).unwrap()[0], Value::Int64(1));
        assert!(table.record(1).is_none());
    }

    #[test]
    fn test_insert_width_mismatch() {
        let mut table = Table::new(test_schema());
        let result = table.insert(Record::from_values(vec![Value::Int64(1)]));
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_type_mismatch() {
        let mut table = Table::new(test_schema());
        let result = table.insert(Record::from_values(vec![
            Value::String("oops".to_string()),
            Value::String("a".to_string()),
        ]));
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_insert_null_is_any_type() {
        let mut table = Table::new(test_schema());
        table
            .insert(Record::from_values(vec![Value::Null, Value::Null]))
            .unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_from_records() {
        let table = Table::from_records(
            test_schema(),
            vec![
                Record::from_values(vec![Value::Int64(1), Value::Null]),
                Record::from_values(vec![Value::Int64(2), Value::Null]),
            ],
        )
        .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.records().len(), 2);
    }

    #[test]
    fn test_empty() {
        let table = Table::empty(test_schema());
        assert!(table.is_empty());
    }
}
