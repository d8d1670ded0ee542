use regatta_common::error::{Error, Result};
use rustc_hash::FxHashSet;

use crate::context::{ExecContext, StreamId};

/// Pull-model record producer. A source emits its current row into its
/// record slot(s) in the execution context; `get_record` reports whether a
/// row is current. Plan-introspection calls walk the source tree without
/// touching execution state.
pub trait RecordSource {
    fn open(&mut self, ctx: &mut ExecContext) -> Result<()>;

    fn get_record(&mut self, ctx: &mut ExecContext) -> Result<bool>;

    fn close(&mut self, ctx: &mut ExecContext) -> Result<()>;

    fn lock_record(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        Err(Error::record_lock_not_supported())
    }

    /// The current row is already materialized through the children.
    fn refetch_record(&mut self, _ctx: &mut ExecContext) -> Result<bool> {
        Ok(true)
    }

    /// Plan-time output cardinality estimate.
    fn cardinality(&self) -> f64;

    fn print(&self, plan: &mut String, detailed: bool, level: usize, recurse: bool);

    fn children(&self) -> Vec<&dyn RecordSource> {
        Vec::new()
    }

    fn mark_recursive(&mut self);

    fn find_used_streams(&self, streams: &mut FxHashSet<StreamId>);

    fn invalidate_records(&self, ctx: &mut ExecContext);

    fn null_records(&self, ctx: &mut ExecContext);
}

/// Newline plus four spaces of indent per level, for detailed plan output.
pub fn print_indent(level: usize) -> String {
    let mut indent = String::with_capacity(1 + level * 4);
    indent.push('\n');
    for _ in 0..level {
        indent.push_str("    ");
    }
    indent
}
