use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use regatta_common::error::{Error, Result};
use regatta_storage::Record;

/// Index of a plan stream. Every leaf source is assigned one at plan time;
/// record slots in the execution context are addressed by it.
pub type StreamId = usize;

/// Per-request execution state: one record slot per plan stream and the
/// request's cancellation flag. Record sources emit a row by writing it into
/// their slot; a parent reading the slot sees the current row of that stream.
pub struct ExecContext {
    slots: Vec<Option<Record>>,
    cancel: Arc<AtomicBool>,
}

impl ExecContext {
    pub fn new(stream_count: usize) -> Self {
        Self {
            slots: vec![None; stream_count],
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle the request owner can set from another thread to abort the
    /// request at its next cooperative yield.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Cooperative yield point. Called at the top of each `get_record`.
    pub fn reschedule(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::cancelled());
        }
        Ok(())
    }

    pub fn stream_count(&self) -> usize {
        self.slots.len()
    }

    pub fn set_record(&mut self, stream: StreamId, record: Record) {
        self.slots[stream] = Some(record);
    }

    pub fn record(&self, stream: StreamId) -> Option<&Record> {
        self.slots.get(stream).and_then(Option::as_ref)
    }

    pub fn clear_record(&mut self, stream: StreamId) {
        self.slots[stream] = None;
    }
}
