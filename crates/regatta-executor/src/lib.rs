mod buffered;
mod collation;
mod context;
mod expr;
mod hash;
mod hash_join;
mod key;
mod record_source;
mod scan;
mod stats;

pub use buffered::BufferedStream;
pub use collation::Collation;
pub use context::{ExecContext, StreamId};
pub use expr::KeyExpr;
pub use hash::hash_bytes;
pub use hash_join::{HashJoin, JoinStream};
pub use key::{encode_keys, KeySpec, DEFAULT_TEXT_KEY_LENGTH};
pub use record_source::{print_indent, RecordSource};
pub use scan::TableScan;
pub use stats::{equality_selectivity, MAXIMUM_SELECTIVITY, REDUCE_SELECTIVITY_FACTOR_EQUALITY};
