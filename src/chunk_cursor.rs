use std::cmp::Ordering;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::ByteRecord;

use crate::error::{AtPath, SortError};
use crate::key::KeyDef;
use crate::keyed_record::KeyedRecord;
use crate::workspace::chunk_reader;

/// Read cursor over a sorted chunk file, holding the next record and its key.
///
/// Cursors order by head record first and by their position in the merge group second.
/// The ordering is reversed so a [std::collections::BinaryHeap] pops the smallest head,
/// and the leftmost cursor wins ties.
pub(crate) struct ChunkCursor<'a> {
    path: PathBuf,
    position: usize,
    reader: csv::Reader<File>,
    head: Option<KeyedRecord>,
    key_def: &'a KeyDef,
}

impl<'a> ChunkCursor<'a> {
    pub(crate) fn open(path: &Path, position: usize, key_def: &'a KeyDef) -> Result<ChunkCursor<'a>, SortError> {
        let reader = chunk_reader(path)?;
        let mut cursor = ChunkCursor {
            path: path.to_path_buf(),
            position,
            reader,
            head: None,
            key_def,
        };
        cursor.head = cursor.read_next()?;
        Ok(cursor)
    }

    fn read_next(&mut self) -> Result<Option<KeyedRecord>, SortError> {
        let mut record = ByteRecord::new();
        loop {
            if !self.reader.read_byte_record(&mut record).at_path(&self.path)? {
                return Ok(None);
            }
            if !record.is_empty() {
                return Ok(Some(KeyedRecord::new(record, self.key_def)?));
            }
        }
    }

    pub(crate) fn peek(&self) -> Option<&KeyedRecord> {
        self.head.as_ref()
    }

    /// Take the head record and read the one after it.
    pub(crate) fn advance(&mut self) -> Result<Option<KeyedRecord>, SortError> {
        let next = self.read_next()?;
        Ok(std::mem::replace(&mut self.head, next))
    }
}

impl<'a> Eq for ChunkCursor<'a> {}

impl<'a> PartialEq<Self> for ChunkCursor<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<'a> PartialOrd<Self> for ChunkCursor<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for ChunkCursor<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        // flipped to work with BinaryHeap (max heap), exhausted cursors pop first
        let heads = match (&self.head, &other.head) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(head), Some(other_head)) => other_head.cmp(head),
        };
        heads.then_with(|| other.position.cmp(&self.position))
    }
}
