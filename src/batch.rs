//! Size-bounded batch packing.
//!
//! Records are packed in arrival order. Packing decisions use the declared
//! source size of the file a record came from, not its serialized size. A
//! new batch opens when the incoming source would push a non-empty batch
//! past the ceiling; an empty batch always admits its first source, so an
//! oversized file ends up alone in its own batch.

use crate::models::Record;

/// An ordered group of records submitted in one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub records: Vec<Record>,
    /// Sum of the declared source sizes of the files in this batch.
    pub source_size: u64,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Packing state owned by a single ingestion run.
#[derive(Debug, Clone)]
pub struct BatchPacker {
    ceiling: u64,
    batches: Vec<Batch>,
}

impl BatchPacker {
    pub fn new(ceiling: u64) -> Self {
        Self {
            ceiling,
            batches: vec![Batch::default()],
        }
    }

    /// Append all `records` of one source to the current batch, opening a
    /// new one first if the source would overflow it.
    ///
    /// Returns the index of the batch the records landed in and that
    /// batch's accumulated source size. An empty record list changes
    /// nothing.
    pub fn add_all(&mut self, records: Vec<Record>, source_size: u64) -> (usize, u64) {
        if records.is_empty() {
            return (self.current_index(), self.current().source_size);
        }

        let current = self.current();
        if !current.is_empty() && current.source_size.saturating_add(source_size) > self.ceiling {
            self.batches.push(Batch::default());
        }

        let index = self.current_index();
        let batch = &mut self.batches[index];
        batch.records.extend(records);
        batch.source_size = batch.source_size.saturating_add(source_size);
        (index, batch.source_size)
    }

    pub fn current_index(&self) -> usize {
        self.batches.len() - 1
    }

    fn current(&self) -> &Batch {
        &self.batches[self.current_index()]
    }

    #[cfg(test)]
    fn record_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    /// Finish packing. Only non-empty batches are returned.
    pub fn into_batches(self) -> Vec<Batch> {
        self.batches.into_iter().filter(|b| !b.is_empty()).collect()
    }
}
