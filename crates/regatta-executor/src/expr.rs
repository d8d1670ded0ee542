use regatta_common::error::{Error, Result};
use regatta_common::types::Value;
use regatta_storage::Field;

use crate::context::{ExecContext, StreamId};

/// A join-key expression. The plan compiler resolves the expression to a
/// column of a stream and binds the column's `Field` descriptor, so key
/// lengths and collations are known before execution starts.
#[derive(Debug, Clone)]
pub enum KeyExpr {
    Column {
        stream: StreamId,
        index: usize,
        field: Field,
    },
}

impl KeyExpr {
    pub fn column(stream: StreamId, index: usize, field: Field) -> Self {
        KeyExpr::Column {
            stream,
            index,
            field,
        }
    }

    /// Plan-time descriptor of the expression result.
    pub fn field(&self) -> &Field {
        match self {
            KeyExpr::Column { field, .. } => field,
        }
    }

    /// Evaluate against the current record slots. A NULL column value
    /// evaluates to `Value::Null`.
    pub fn evaluate(&self, ctx: &ExecContext) -> Result<Value> {
        match self {
            KeyExpr::Column { stream, index, .. } => {
                let record = ctx.record(*stream).ok_or_else(|| {
                    Error::internal(format!("stream {} has no current record", stream))
                })?;
                let value = record.get(*index).ok_or_else(|| {
                    Error::column_not_found(format!("column {} of stream {}", index, stream))
                })?;
                Ok(value.clone())
            }
        }
    }
}
