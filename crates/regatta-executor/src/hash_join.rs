use regatta_common::error::{Error, Result};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::buffered::BufferedStream;
use crate::context::{ExecContext, StreamId};
use crate::expr::KeyExpr;
use crate::key::{encode_keys, total_key_length, KeySpec};
use crate::record_source::{print_indent, RecordSource};
use crate::stats::equality_selectivity;

const HASH_SIZE: usize = 1009;
const BUCKET_PREALLOCATE: usize = 32;

#[derive(Debug, Clone, Copy)]
struct Entry {
    hash: u32,
    position: u32,
}

/// Entries sharing one hash-table slot, sorted by hash once build finishes.
/// Carries the iteration cursor used while walking equal-hash entries.
#[derive(Debug)]
struct CollisionBucket {
    entries: Vec<Entry>,
    cursor: Option<usize>,
}

impl CollisionBucket {
    fn new() -> Self {
        Self {
            entries: Vec::with_capacity(BUCKET_PREALLOCATE),
            cursor: None,
        }
    }

    fn add(&mut self, hash: u32, position: u32) {
        self.entries.push(Entry { hash, position });
    }

    fn sort(&mut self) {
        self.entries.sort_unstable_by_key(|e| e.hash);
    }

    /// Position the cursor at the first entry with this hash.
    fn locate(&mut self, hash: u32) -> bool {
        let index = self.entries.partition_point(|e| e.hash < hash);
        if index < self.entries.len() && self.entries[index].hash == hash {
            self.cursor = Some(index);
            true
        } else {
            self.cursor = None;
            false
        }
    }

    /// Yield the position under the cursor if its entry still carries the
    /// hash, advancing the cursor. Otherwise the cursor is invalidated.
    fn iterate(&mut self, hash: u32) -> Option<u32> {
        let index = self.cursor?;
        if index >= self.entries.len() {
            return None;
        }

        let entry = self.entries[index];
        if entry.hash != hash {
            self.cursor = None;
            return None;
        }

        self.cursor = Some(index + 1);
        Some(entry.position)
    }
}

/// One sub-table per inner stream, all sharing the same slot layout, so a
/// probe hash selects one bucket in every sub-table at once. The slot chosen
/// by the last successful `setup` is shared across streams.
#[derive(Debug)]
struct HashTable {
    stream_count: usize,
    table_size: usize,
    buckets: Vec<Option<CollisionBucket>>,
    slot: usize,
}

impl HashTable {
    fn new(stream_count: usize) -> Self {
        Self {
            stream_count,
            table_size: HASH_SIZE,
            buckets: (0..stream_count * HASH_SIZE).map(|_| None).collect(),
            slot: 0,
        }
    }

    fn bucket_index(&self, stream: usize, slot: usize) -> usize {
        debug_assert!(stream < self.stream_count);
        debug_assert!(slot < self.table_size);
        stream * self.table_size + slot
    }

    fn put(&mut self, stream: usize, hash: u32, position: u32) {
        let slot = hash as usize % self.table_size;
        let index = self.bucket_index(stream, slot);
        self.buckets[index]
            .get_or_insert_with(CollisionBucket::new)
            .add(hash, position);
    }

    fn sort(&mut self) {
        for bucket in self.buckets.iter_mut().flatten() {
            bucket.sort();
        }
    }

    /// True when every stream's bucket for this hash's slot holds at least
    /// one matching entry. Only then is the shared slot updated and every
    /// stream's cursor left at its first match.
    fn setup(&mut self, hash: u32) -> bool {
        let slot = hash as usize % self.table_size;

        for stream in 0..self.stream_count {
            let index = self.bucket_index(stream, slot);
            let located = match self.buckets[index].as_mut() {
                Some(bucket) => bucket.locate(hash),
                None => false,
            };
            if !located {
                return false;
            }
        }

        self.slot = slot;
        true
    }

    /// Rewind one stream's cursor to the first entry with this hash in the
    /// shared slot.
    fn reset(&mut self, stream: usize, hash: u32) {
        let index = self.bucket_index(stream, self.slot);
        if let Some(bucket) = self.buckets[index].as_mut() {
            bucket.locate(hash);
        }
    }

    fn iterate(&mut self, stream: usize, hash: u32) -> Option<u32> {
        let index = self.bucket_index(stream, self.slot);
        self.buckets[index].as_mut()?.iterate(hash)
    }
}

/// One input of the join: the child source and its key expressions.
pub struct JoinStream {
    pub source: Box<dyn RecordSource>,
    pub keys: Vec<KeyExpr>,
}

impl JoinStream {
    pub fn new(source: Box<dyn RecordSource>, keys: Vec<KeyExpr>) -> Self {
        Self { source, keys }
    }
}

struct LeaderStream {
    source: Box<dyn RecordSource>,
    keys: Vec<KeyExpr>,
    specs: Vec<KeySpec>,
    total_key_length: usize,
}

struct InnerStream {
    buffer: BufferedStream,
    keys: Vec<KeyExpr>,
    specs: Vec<KeySpec>,
    total_key_length: usize,
}

fn bind_specs(keys: &[KeyExpr]) -> Result<(Vec<KeySpec>, usize)> {
    let specs = keys
        .iter()
        .map(|key| KeySpec::for_field(key.field()))
        .collect::<Result<Vec<_>>>()?;
    let total = total_key_length(&specs);
    Ok((specs, total))
}

/// Per-open mutable state. `open` mirrors the operator lifecycle; the hash
/// table and leader key buffer exist only between the first probe and close.
#[derive(Default)]
struct Impure {
    open: bool,
    must_read: bool,
    first: bool,
    hash_table: Option<HashTable>,
    leader_buffer: Option<Vec<u8>>,
    leader_hash: u32,
}

/// Inner-join record source over one leader (probe) stream and one or more
/// materialized inner (build) streams, matching on hash equality of encoded
/// key images. Matching is by full 32-bit hash; rows whose source values
/// differ but hash equally are still emitted, and a residual predicate
/// downstream re-checks the join condition when key encodings are not
/// proven unique.
pub struct HashJoin {
    leader: LeaderStream,
    inner: Vec<InnerStream>,
    cardinality: f64,
    impure: Impure,
}

impl HashJoin {
    pub fn new(
        leader: JoinStream,
        inners: Vec<JoinStream>,
        selectivity: Option<f64>,
    ) -> Result<Self> {
        if inners.is_empty() {
            return Err(Error::internal("hash join requires at least one inner stream"));
        }

        let key_count = leader.keys.len();
        if key_count == 0 {
            return Err(Error::internal("hash join requires at least one key"));
        }

        let (specs, leader_total) = bind_specs(&leader.keys)?;
        let mut cardinality = leader.source.cardinality();
        let leader = LeaderStream {
            source: leader.source,
            keys: leader.keys,
            specs,
            total_key_length: leader_total,
        };

        let mut inner = Vec::with_capacity(inners.len());
        let mut inner_key_count = 0;
        for arg in inners {
            if arg.keys.len() != key_count {
                return Err(Error::internal("hash join streams disagree on key count"));
            }

            cardinality *= arg.source.cardinality();
            inner_key_count += arg.keys.len();

            let (specs, total) = bind_specs(&arg.keys)?;
            inner.push(InnerStream {
                buffer: BufferedStream::new(arg.source),
                keys: arg.keys,
                specs,
                total_key_length: total,
            });
        }

        let selectivity = selectivity.unwrap_or_else(|| equality_selectivity(inner_key_count));
        cardinality *= selectivity;

        Ok(Self {
            leader,
            inner,
            cardinality,
            impure: Impure::default(),
        })
    }

    /// Ceiling on total inner cardinality for which probe performance stays
    /// acceptable. Binary search across 1000 collisions costs about as much
    /// as linear search across 10, which is the rough cut-off the planner
    /// applies when choosing this operator.
    pub fn max_capacity() -> usize {
        HASH_SIZE * 1000
    }

    /// Read and cache every inner stream, hashing the key of each row into
    /// that stream's sub-table. Runs once per open, on the first probe.
    fn build(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let mut table = HashTable::new(self.inner.len());

        for (stream, arg) in self.inner.iter_mut().enumerate() {
            arg.buffer.open(ctx)?;

            let mut key_buffer = vec![0u8; arg.total_key_length];
            let mut counter: u32 = 0;

            while arg.buffer.get_record(ctx)? {
                let hash = encode_keys(ctx, &arg.keys, &arg.specs, &mut key_buffer)?;
                table.put(stream, hash, counter);
                counter += 1;
            }

            debug!(stream, rows = counter, "hash join inner stream indexed");
        }

        table.sort();

        self.impure.hash_table = Some(table);
        self.impure.leader_buffer = Some(vec![0u8; self.leader.total_key_length]);
        Ok(())
    }

    /// Advance `stream` to its next matching inner row, cascading into the
    /// outer inner streams when it is exhausted: the nearest stream that
    /// still advances steps once, every stream below it is rewound to the
    /// first entry of the probe hash, and the walk descends again. This
    /// enumerates the full Cartesian product of matching rows.
    fn fetch_record(&mut self, ctx: &mut ExecContext, stream: usize) -> Result<bool> {
        let hash = self.impure.leader_hash;
        let table = self
            .impure
            .hash_table
            .as_mut()
            .ok_or_else(|| Error::internal("hash join is not built"))?;

        let mut level = stream;
        loop {
            let advanced = match table.iterate(level, hash) {
                Some(position) => {
                    let arg = &mut self.inner[level];
                    arg.buffer.locate(position as usize)?;
                    arg.buffer.get_record(ctx)?
                }
                None => false,
            };

            if advanced {
                if level == stream {
                    return Ok(true);
                }
                level += 1;
                table.reset(level, hash);
            } else {
                if level == 0 {
                    return Ok(false);
                }
                level -= 1;
            }
        }
    }
}

impl RecordSource for HashJoin {
    fn open(&mut self, ctx: &mut ExecContext) -> Result<()> {
        // Drops whatever survived a prior open; the table is rebuilt lazily
        // on the first probe, so an empty leader never pays for a build.
        self.impure = Impure {
            open: true,
            must_read: true,
            ..Impure::default()
        };

        self.leader.source.open(ctx)
    }

    fn get_record(&mut self, ctx: &mut ExecContext) -> Result<bool> {
        ctx.reschedule()?;

        if !self.impure.open {
            return Ok(false);
        }

        loop {
            if self.impure.must_read {
                // Fetch the next row from the leading stream.
                if !self.leader.source.get_record(ctx)? {
                    return Ok(false);
                }

                if self.impure.hash_table.is_none() {
                    self.build(ctx)?;
                }

                // Compute and hash the comparison keys.
                let buffer = self
                    .impure
                    .leader_buffer
                    .as_mut()
                    .ok_or_else(|| Error::internal("hash join leader buffer missing"))?;
                let hash = encode_keys(ctx, &self.leader.keys, &self.leader.specs, buffer)?;
                self.impure.leader_hash = hash;

                // Require a match in every inner stream for this slot and
                // leave the cursors ready for collision iteration.
                let table = self
                    .impure
                    .hash_table
                    .as_mut()
                    .ok_or_else(|| Error::internal("hash join is not built"))?;
                if !table.setup(hash) {
                    continue;
                }

                self.impure.must_read = false;
                self.impure.first = true;
            }

            if self.impure.first {
                // First combination for this probe: every inner stream must
                // deliver a row.
                let mut found = true;
                for stream in 0..self.inner.len() {
                    if !self.fetch_record(ctx, stream)? {
                        found = false;
                        break;
                    }
                }

                if !found {
                    self.impure.must_read = true;
                    continue;
                }

                self.impure.first = false;
            } else if !self.fetch_record(ctx, self.inner.len() - 1)? {
                self.impure.must_read = true;
                continue;
            }

            return Ok(true);
        }
    }

    fn close(&mut self, ctx: &mut ExecContext) -> Result<()> {
        self.invalidate_records(ctx);

        if self.impure.open {
            self.impure.open = false;
            self.impure.hash_table = None;
            self.impure.leader_buffer = None;

            for arg in &mut self.inner {
                arg.buffer.close(ctx)?;
            }

            self.leader.source.close(ctx)?;
        }

        Ok(())
    }

    fn cardinality(&self) -> f64 {
        self.cardinality
    }

    fn print(&self, plan: &mut String, detailed: bool, level: usize, recurse: bool) {
        if detailed {
            let level = level + 1;
            plan.push_str(&print_indent(level));
            plan.push_str("Hash Join (inner)");

            if recurse {
                self.leader.source.print(plan, true, level, recurse);
                for arg in &self.inner {
                    arg.buffer.source().print(plan, true, level, recurse);
                }
            }
        } else {
            let level = level + 1;
            plan.push_str("HASH (");
            self.leader.source.print(plan, false, level, recurse);
            plan.push_str(", ");
            for (i, arg) in self.inner.iter().enumerate() {
                if i > 0 {
                    plan.push_str(", ");
                }
                arg.buffer.source().print(plan, false, level, recurse);
            }
            plan.push(')');
        }
    }

    fn children(&self) -> Vec<&dyn RecordSource> {
        let mut children: Vec<&dyn RecordSource> = vec![self.leader.source.as_ref()];
        for arg in &self.inner {
            children.push(arg.buffer.source());
        }
        children
    }

    fn mark_recursive(&mut self) {
        self.leader.source.mark_recursive();
        for arg in &mut self.inner {
            arg.buffer.source_mut().mark_recursive();
        }
    }

    fn find_used_streams(&self, streams: &mut FxHashSet<StreamId>) {
        self.leader.source.find_used_streams(streams);
        for arg in &self.inner {
            arg.buffer.source().find_used_streams(streams);
        }
    }

    fn invalidate_records(&self, ctx: &mut ExecContext) {
        self.leader.source.invalidate_records(ctx);
        for arg in &self.inner {
            arg.buffer.source().invalidate_records(ctx);
        }
    }

    fn null_records(&self, ctx: &mut ExecContext) {
        self.leader.source.null_records(ctx);
        for arg in &self.inner {
            arg.buffer.source().null_records(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regatta_common::types::{DataType, Value};
    use regatta_storage::{Field, Record, Schema, Table};

    use super::*;
    use crate::scan::TableScan;

    #[test]
    fn test_bucket_locate_and_iterate() {
        let mut bucket = CollisionBucket::new();
        bucket.add(30, 2);
        bucket.add(10, 0);
        bucket.add(10, 1);
        bucket.add(20, 3);
        bucket.sort();

        assert!(bucket.locate(10));
        assert_eq!(bucket.iterate(10), Some(0));
        assert_eq!(bucket.iterate(10), Some(1));
        assert_eq!(bucket.iterate(10), None);

        assert!(bucket.locate(20));
        assert_eq!(bucket.iterate(20), Some(3));
        assert_eq!(bucket.iterate(20), None);
    }

    #[test]
    fn test_bucket_locate_missing_invalidates_cursor() {
        let mut bucket = CollisionBucket::new();
        bucket.add(10, 0);
        bucket.sort();

        assert!(bucket.locate(10));
        assert!(!bucket.locate(99));
        assert_eq!(bucket.iterate(10), None);
    }

    #[test]
    fn test_bucket_iterate_without_locate() {
        let mut bucket = CollisionBucket::new();
        bucket.add(10, 0);
        bucket.sort();
        assert_eq!(bucket.iterate(10), None);
    }

    #[test]
    fn test_bucket_sorts_ascending() {
        let mut bucket = CollisionBucket::new();
        for hash in [5u32, 3, 9, 3, 1] {
            bucket.add(hash, hash);
        }
        bucket.sort();
        let hashes: Vec<u32> = bucket.entries.iter().map(|e| e.hash).collect();
        assert_eq!(hashes, vec![1, 3, 3, 5, 9]);
    }

    #[test]
    fn test_hash_table_setup_requires_every_stream() {
        let mut table = HashTable::new(2);
        table.put(0, 42, 0);
        table.sort();

        // Stream 1 has nothing in the slot of 42.
        assert!(!table.setup(42));

        table.put(1, 42, 7);
        table.sort();
        assert!(table.setup(42));
        assert_eq!(table.iterate(0, 42), Some(0));
        assert_eq!(table.iterate(1, 42), Some(7));
    }

    #[test]
    fn test_hash_table_slot_collision_differing_hash() {
        // Same slot, different full hashes: setup must only accept entries
        // carrying the probe's own hash.
        let mut table = HashTable::new(1);
        let hash = 5u32;
        let colliding = 5 + HASH_SIZE as u32;
        table.put(0, colliding, 0);
        table.sort();

        assert!(!table.setup(hash));

        table.put(0, hash, 1);
        table.sort();
        assert!(table.setup(hash));
        assert_eq!(table.iterate(0, hash), Some(1));
        assert_eq!(table.iterate(0, hash), None);
    }

    #[test]
    fn test_hash_table_reset_rewinds_stream() {
        let mut table = HashTable::new(1);
        table.put(0, 11, 0);
        table.put(0, 11, 1);
        table.sort();

        assert!(table.setup(11));
        assert_eq!(table.iterate(0, 11), Some(0));
        assert_eq!(table.iterate(0, 11), Some(1));
        assert_eq!(table.iterate(0, 11), None);

        table.reset(0, 11);
        assert_eq!(table.iterate(0, 11), Some(0));
    }

    #[test]
    fn test_max_capacity() {
        assert_eq!(HashJoin::max_capacity(), 1009 * 1000);
    }

    fn int_stream(values: Vec<i64>, stream: StreamId) -> JoinStream {
        let schema = Schema::from_fields(vec![Field::nullable("id", DataType::Int64)]);
        let records = values
            .into_iter()
            .map(|v| Record::from_values(vec![Value::Int64(v)]))
            .collect();
        let table = Arc::new(Table::from_records(schema, records).unwrap());
        JoinStream::new(
            Box::new(TableScan::new(format!("t{}", stream), table, stream)),
            vec![KeyExpr::column(
                stream,
                0,
                Field::nullable("id", DataType::Int64),
            )],
        )
    }

    #[test]
    fn test_new_requires_inner_stream() {
        assert!(HashJoin::new(int_stream(vec![1], 0), vec![], None).is_err());
    }

    #[test]
    fn test_new_requires_matching_key_counts() {
        let leader = int_stream(vec![1], 0);
        let mut inner = int_stream(vec![1], 1);
        inner.keys.push(KeyExpr::column(
            1,
            0,
            Field::nullable("id", DataType::Int64),
        ));
        assert!(HashJoin::new(leader, vec![inner], None).is_err());
    }

    #[test]
    fn test_cardinality_default_selectivity() {
        let join = HashJoin::new(
            int_stream(vec![1, 2, 3], 0),
            vec![int_stream(vec![1, 2, 3, 4], 1)],
            None,
        )
        .unwrap();
        // 3 * 4 rows, one equality key at 0.1.
        assert!((join.cardinality() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_cardinality_explicit_selectivity() {
        let join = HashJoin::new(
            int_stream(vec![1, 2], 0),
            vec![int_stream(vec![1, 2], 1)],
            Some(0.5),
        )
        .unwrap();
        assert!((join.cardinality() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_lock_record_fails_refetch_succeeds() {
        let mut ctx = ExecContext::new(2);
        let mut join = HashJoin::new(
            int_stream(vec![1], 0),
            vec![int_stream(vec![1], 1)],
            None,
        )
        .unwrap();
        assert!(matches!(
            join.lock_record(&mut ctx),
            Err(Error::RecordLockNotSupported)
        ));
        assert!(join.refetch_record(&mut ctx).unwrap());
    }

    #[test]
    fn test_get_record_before_open_is_false() {
        let mut ctx = ExecContext::new(2);
        let mut join = HashJoin::new(
            int_stream(vec![1], 0),
            vec![int_stream(vec![1], 1)],
            None,
        )
        .unwrap();
        assert!(!join.get_record(&mut ctx).unwrap());
    }

    #[test]
    fn test_find_used_streams_covers_all_children() {
        let join = HashJoin::new(
            int_stream(vec![1], 0),
            vec![int_stream(vec![1], 1), int_stream(vec![1], 2)],
            None,
        )
        .unwrap();

        let mut streams = FxHashSet::default();
        join.find_used_streams(&mut streams);
        assert_eq!(streams.len(), 3);
        assert!(streams.contains(&0) && streams.contains(&1) && streams.contains(&2));
        assert_eq!(join.children().len(), 3);
    }
}
