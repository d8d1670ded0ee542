use std::sync::Arc;

use regatta_common::error::Result;
use regatta_storage::{Record, Table};
use rustc_hash::FxHashSet;

use crate::context::{ExecContext, StreamId};
use crate::record_source::{print_indent, RecordSource};

/// Full scan over an in-memory table. Rows come out in insertion order, so
/// repeated scans of an unchanged table are deterministic.
pub struct TableScan {
    name: String,
    table: Arc<Table>,
    stream: StreamId,
    position: usize,
    open: bool,
    recursive: bool,
}

impl TableScan {
    pub fn new(name: impl Into<String>, table: Arc<Table>, stream: StreamId) -> Self {
        Self {
            name: name.into(),
            table,
            stream,
            position: 0,
            open: false,
            recursive: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }
}

impl RecordSource for TableScan {
    fn open(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        self.position = 0;
        self.open = true;
        Ok(())
    }

    fn get_record(&mut self, ctx: &mut ExecContext) -> Result<bool> {
        ctx.reschedule()?;

        if !self.open {
            return Ok(false);
        }

        match self.table.record(self.position) {
            Some(record) => {
                ctx.set_record(self.stream, record.clone());
                self.position += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn close(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn cardinality(&self) -> f64 {
        self.table.row_count() as f64
    }

    fn print(&self, plan: &mut String, detailed: bool, level: usize, _recurse: bool) {
        if detailed {
            plan.push_str(&print_indent(level + 1));
            plan.push_str(&format!("Table \"{}\" Full Scan", self.name));
        } else {
            plan.push_str(&self.name);
        }
    }

    fn mark_recursive(&mut self) {
        self.recursive = true;
    }

    fn find_used_streams(&self, streams: &mut FxHashSet<StreamId>) {
        streams.insert(self.stream);
    }

    fn invalidate_records(&self, ctx: &mut ExecContext) {
        ctx.clear_record(self.stream);
    }

    fn null_records(&self, ctx: &mut ExecContext) {
        ctx.set_record(self.stream, Record::nulls(self.table.schema().num_fields()));
    }
}
