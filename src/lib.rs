//! Regatta - a row-oriented relational execution engine excerpt built
//! around its multi-way hash-join operator.
//!
//! # Architecture
//!
//! Record sources form a pull-model tree: a parent asks a child for its next
//! row via `get_record`, and the child materializes that row into its record
//! slot in the per-request [`ExecContext`]. The hash join combines one
//! leader (probe) stream with one or more materialized inner (build)
//! streams on equality of encoded key images:
//!
//! ```text
//! leader row -> key image -> hash -> one slot across every inner sub-table
//!            -> Cartesian walk over the matching collision entries
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use regatta::{ExecContext, HashJoin, JoinStream, KeyExpr, RecordSource};
//!
//! let mut join = HashJoin::new(leader, vec![orders, items], None)?;
//! let mut ctx = ExecContext::new(3);
//! join.open(&mut ctx)?;
//! while join.get_record(&mut ctx)? {
//!     // one matching combination per call, visible through the slots
//! }
//! join.close(&mut ctx)?;
//! ```

pub use regatta_common::error::{Error, Result};
pub use regatta_common::types::{DataType, TimeTzValue, Value};
pub use regatta_executor::{
    encode_keys, equality_selectivity, hash_bytes, print_indent, BufferedStream, Collation,
    ExecContext, HashJoin, JoinStream, KeyExpr, KeySpec, RecordSource, StreamId, TableScan,
    DEFAULT_TEXT_KEY_LENGTH, MAXIMUM_SELECTIVITY, REDUCE_SELECTIVITY_FACTOR_EQUALITY,
};
pub use regatta_storage::{Field, FieldMode, Record, Schema, Table};
