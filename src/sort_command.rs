use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use command_executor::command::Command;

use crate::error::{AtPath, SortError};
use crate::key::KeyDef;
use crate::keyed_record::KeyedRecord;
use crate::splitter::Chunk;
use crate::workspace::{chunk_reader, chunk_writer, create_tmp_file};

/// First failure reported by any chunk sort of a run
pub(crate) type Failure = Arc<Mutex<Option<anyhow::Error>>>;

/// Sorts one chunk file in place. Chunk sorts share nothing but the failure slot.
pub(crate) struct SortCommand {
    chunk: Chunk,
    key_def: Arc<KeyDef>,
    failure: Failure,
}

impl SortCommand {
    pub(crate) fn new(chunk: Chunk, key_def: Arc<KeyDef>, failure: Failure) -> SortCommand {
        SortCommand {
            chunk,
            key_def,
            failure,
        }
    }

    fn read_records(chunk: &Chunk, key_def: &KeyDef) -> Result<Vec<KeyedRecord>, SortError> {
        let mut reader = chunk_reader(chunk.path())?;
        let mut keyed_records = Vec::new();
        for (row, record) in (chunk.first_row()..).zip(reader.byte_records()) {
            let record = record.at_path(chunk.path())?;
            if record.is_empty() {
                continue;
            }
            keyed_records.push(KeyedRecord::new(record, key_def).map_err(|e| e.at_row(row))?);
        }
        Ok(keyed_records)
    }

    /// Read the chunk, sort its records by key and replace the chunk with the sorted
    /// records. The sort is stable. Returns the number of records.
    pub(crate) fn sort_chunk(chunk: &Chunk, key_def: &KeyDef) -> Result<usize, anyhow::Error> {
        let mut keyed_records = Self::read_records(chunk, key_def)
            .with_context(|| format!("sorting chunk {}", chunk.path().display()))?;
        let chunk = chunk.path();
        keyed_records.sort();

        let dir = chunk.parent().unwrap_or_else(|| Path::new("."));
        let mut sorted_file = create_tmp_file(dir, "sorted-")?;
        {
            let mut writer = chunk_writer(sorted_file.as_file_mut());
            for keyed_record in &keyed_records {
                writer.write_byte_record(keyed_record.record()).at_path(chunk)?;
            }
            writer.flush().at_path(chunk)?;
        }
        sorted_file.persist(chunk).map_err(|e| SortError::io(chunk, e.error))?;
        log::debug!("Sorted chunk {}, records: {}", chunk.display(), keyed_records.len());
        Ok(keyed_records.len())
    }

    fn record_failure(&self, error: anyhow::Error) {
        match self.failure.lock() {
            Ok(mut failure) => {
                if failure.is_none() {
                    *failure = Some(error);
                }
            }
            Err(_) => log::error!("Failed to record chunk sort failure: {}", error),
        }
    }

    fn failed(&self) -> bool {
        self.failure.lock().map(|failure| failure.is_some()).unwrap_or(true)
    }
}

impl Command for SortCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        // the pool does not report command errors back, the run checks the failure slot
        // after joining
        if self.failed() {
            log::debug!("Skipping chunk {} after an earlier failure", self.chunk.path().display());
            return Ok(());
        }
        if let Err(e) = Self::sort_chunk(&self.chunk, &self.key_def) {
            log::error!("Chunk sort failed, chunk: {}, error: {:#}", self.chunk.path().display(), e);
            self.record_failure(e);
        }
        Ok(())
    }
}
