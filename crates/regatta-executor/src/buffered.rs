use regatta_common::error::{Error, Result};
use regatta_storage::Record;
use rustc_hash::FxHashSet;

use crate::context::{ExecContext, StreamId};
use crate::record_source::RecordSource;

/// Materializing wrapper around a record source. Rows pulled through it are
/// retained, and `locate` rewinds the cursor to any previously produced row
/// so the wrapped stream becomes random-access after a full read. For plan
/// analysis the wrapper is transparent: every introspection call forwards to
/// the wrapped source.
pub struct BufferedStream {
    source: Box<dyn RecordSource>,
    streams: Vec<StreamId>,
    buffer: Vec<Vec<Option<Record>>>,
    position: usize,
    exhausted: bool,
}

impl BufferedStream {
    pub fn new(source: Box<dyn RecordSource>) -> Self {
        let mut used = FxHashSet::default();
        source.find_used_streams(&mut used);
        let mut streams: Vec<StreamId> = used.into_iter().collect();
        streams.sort_unstable();

        Self {
            source,
            streams,
            buffer: Vec::new(),
            position: 0,
            exhausted: false,
        }
    }

    pub fn source(&self) -> &dyn RecordSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn RecordSource {
        self.source.as_mut()
    }

    /// Number of rows produced and retained so far.
    pub fn buffered_rows(&self) -> usize {
        self.buffer.len()
    }

    /// Reposition the cursor. Positions correspond 1:1 to the order rows
    /// were produced; `buffered_rows()` itself is valid and means "next pull
    /// comes from the wrapped source".
    pub fn locate(&mut self, position: usize) -> Result<()> {
        if position > self.buffer.len() {
            return Err(Error::internal(format!(
                "locate past buffered rows: {} > {}",
                position,
                self.buffer.len()
            )));
        }
        self.position = position;
        Ok(())
    }

    fn restore(&self, ctx: &mut ExecContext, row: usize) {
        for (stream, record) in self.streams.iter().zip(&self.buffer[row]) {
            match record {
                Some(record) => ctx.set_record(*stream, record.clone()),
                None => ctx.clear_record(*stream),
            }
        }
    }

    fn snapshot(&self, ctx: &ExecContext) -> Vec<Option<Record>> {
        self.streams
            .iter()
            .map(|&stream| ctx.record(stream).cloned())
            .collect()
    }
}

impl RecordSource for BufferedStream {
    fn open(&mut self, ctx: &mut ExecContext) -> Result<()> {
        self.buffer.clear();
        self.position = 0;
        self.exhausted = false;
        self.source.open(ctx)
    }

    fn get_record(&mut self, ctx: &mut ExecContext) -> Result<bool> {
        if self.position < self.buffer.len() {
            self.restore(ctx, self.position);
            self.position += 1;
            return Ok(true);
        }

        if self.exhausted {
            return Ok(false);
        }

        if self.source.get_record(ctx)? {
            self.buffer.push(self.snapshot(ctx));
            self.position = self.buffer.len();
            Ok(true)
        } else {
            self.exhausted = true;
            Ok(false)
        }
    }

    fn close(&mut self, ctx: &mut ExecContext) -> Result<()> {
        self.buffer.clear();
        self.position = 0;
        self.exhausted = false;
        self.source.close(ctx)
    }

    fn cardinality(&self) -> f64 {
        self.source.cardinality()
    }

    fn print(&self, plan: &mut String, detailed: bool, level: usize, recurse: bool) {
        self.source.print(plan, detailed, level, recurse);
    }

    fn children(&self) -> Vec<&dyn RecordSource> {
        vec![self.source.as_ref()]
    }

    fn mark_recursive(&mut self) {
        self.source.mark_recursive();
    }

    fn find_used_streams(&self, streams: &mut FxHashSet<StreamId>) {
        self.source.find_used_streams(streams);
    }

    fn invalidate_records(&self, ctx: &mut ExecContext) {
        self.source.invalidate_records(ctx);
    }

    fn null_records(&self, ctx: &mut ExecContext) {
        self.source.null_records(ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regatta_common::types::{DataType, Value};
    use regatta_storage::{Field, Schema, Table};

    use super::*;
    use crate::scan::TableScan;

    fn buffered_over(values: Vec<i64>) -> BufferedStream {
        let schema = Schema::from_fields(vec![Field::nullable("id", DataType::Int64)]);
        let records = values
            .into_iter()
            .map(|v| Record::from_values(vec![Value::Int64(v)]))
            .collect();
        let table = Arc::new(Table::from_records(schema, records).unwrap());
        BufferedStream::new(Box::new(TableScan::new("t", table, 0)))
    }

    fn drain(stream: &mut BufferedStream, ctx: &mut ExecContext) -> Vec<Value> {
        let mut seen = Vec::new();
        while stream.get_record(ctx).unwrap() {
            seen.push(ctx.record(0).unwrap()[0].clone());
        }
        seen
    }

    #[test]
    fn test_buffers_while_reading() {
        let mut ctx = ExecContext::new(1);
        let mut stream = buffered_over(vec![1, 2, 3]);

        stream.open(&mut ctx).unwrap();
        assert_eq!(
            drain(&mut stream, &mut ctx),
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]
        );
        assert_eq!(stream.buffered_rows(), 3);
    }

    #[test]
    fn test_locate_replays_buffered_rows() {
        let mut ctx = ExecContext::new(1);
        let mut stream = buffered_over(vec![10, 20, 30]);

        stream.open(&mut ctx).unwrap();
        drain(&mut stream, &mut ctx);

        stream.locate(1).unwrap();
        assert!(stream.get_record(&mut ctx).unwrap());
        assert_eq!(ctx.record(0).unwrap()[0], Value::Int64(20));

        stream.locate(0).unwrap();
        assert!(stream.get_record(&mut ctx).unwrap());
        assert_eq!(ctx.record(0).unwrap()[0], Value::Int64(10));
        assert!(stream.get_record(&mut ctx).unwrap());
        assert_eq!(ctx.record(0).unwrap()[0], Value::Int64(20));
    }

    #[test]
    fn test_locate_past_buffer_fails() {
        let mut ctx = ExecContext::new(1);
        let mut stream = buffered_over(vec![1]);

        stream.open(&mut ctx).unwrap();
        drain(&mut stream, &mut ctx);

        assert!(stream.locate(1).is_ok());
        assert!(stream.locate(2).is_err());
    }

    #[test]
    fn test_exhaustion_is_remembered() {
        let mut ctx = ExecContext::new(1);
        let mut stream = buffered_over(vec![1]);

        stream.open(&mut ctx).unwrap();
        drain(&mut stream, &mut ctx);
        assert!(!stream.get_record(&mut ctx).unwrap());
        assert!(!stream.get_record(&mut ctx).unwrap());
    }

    #[test]
    fn test_reopen_discards_buffer() {
        let mut ctx = ExecContext::new(1);
        let mut stream = buffered_over(vec![1, 2]);

        stream.open(&mut ctx).unwrap();
        drain(&mut stream, &mut ctx);
        assert_eq!(stream.buffered_rows(), 2);

        stream.open(&mut ctx).unwrap();
        assert_eq!(stream.buffered_rows(), 0);
        assert_eq!(
            drain(&mut stream, &mut ctx),
            vec![Value::Int64(1), Value::Int64(2)]
        );
    }

    #[test]
    fn test_plan_analysis_passes_through() {
        let stream = buffered_over(vec![1, 2]);

        let mut streams = FxHashSet::default();
        stream.find_used_streams(&mut streams);
        assert!(streams.contains(&0));

        let mut plan = String::new();
        stream.print(&mut plan, false, 0, true);
        assert_eq!(plan, "t");

        assert_eq!(stream.cardinality(), 2.0);
        assert_eq!(stream.children().len(), 1);
    }
}
