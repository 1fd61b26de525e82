use std::io::Read;
use std::mem::size_of;
use std::path::{Path, PathBuf};

use anyhow::Context;
use csv::ByteRecord;

use crate::error::{AtPath, SortError};
use crate::workspace::{chunk_writer, Workspace};

/// A chunk file and the row of its first record in the input it was split from.
#[derive(Clone, Debug)]
pub(crate) struct Chunk {
    path: PathBuf,
    first_row: u64,
}

impl Chunk {
    pub(crate) fn new(path: PathBuf, first_row: u64) -> Chunk {
        Chunk { path, first_row }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based, counted over the data records of the input
    pub(crate) fn first_row(&self) -> u64 {
        self.first_row
    }

    pub(crate) fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Splits a record stream into chunk files of roughly `threshold` bytes each.
///
/// Each call to `next` writes one chunk into the workspace and yields it. A chunk
/// is closed once the estimated in-memory size of its records exceeds the threshold, so
/// a chunk always holds at least one record and may overshoot the threshold by one record.
pub(crate) struct ChunkSplitter<'a, R: Read> {
    reader: &'a mut csv::Reader<R>,
    workspace: &'a Workspace,
    source: PathBuf,
    threshold: u64,
    record: ByteRecord,
    rows: u64,
    done: bool,
}

impl<'a, R: Read> ChunkSplitter<'a, R> {
    pub(crate) fn new(reader: &'a mut csv::Reader<R>, workspace: &'a Workspace, source: PathBuf, threshold: u64) -> ChunkSplitter<'a, R> {
        ChunkSplitter {
            reader,
            workspace,
            source,
            threshold,
            record: ByteRecord::new(),
            rows: 0,
            done: false,
        }
    }

    fn read_record(&mut self) -> Result<bool, SortError> {
        let more = self.reader.read_byte_record(&mut self.record).at_path(&self.source)?;
        if more {
            self.rows += 1;
        } else {
            self.done = true;
        }
        Ok(more)
    }

    fn write_chunk(&mut self) -> Result<Option<Chunk>, SortError> {
        if self.done || !self.read_record()? {
            return Ok(None);
        }

        let first_row = self.rows;
        let mut chunk_file = self.workspace.create_file("split-")?;
        let path = chunk_file.path().to_path_buf();
        let mut records = 0;
        let mut size = 0;
        {
            let mut writer = chunk_writer(chunk_file.as_file_mut());
            loop {
                writer.write_byte_record(&self.record).at_path(&path)?;
                records += 1;
                size += approximate_size(&self.record);
                if size > self.threshold || !self.read_record()? {
                    break;
                }
            }
            writer.flush().at_path(&path)?;
        }
        let (_file, path) = chunk_file.keep().map_err(|e| SortError::io(&path, e.error))?;
        log::debug!("Split chunk {}, first row: {}, records: {}, approximate size: {}", path.display(), first_row, records, size);
        Ok(Some(Chunk::new(path, first_row)))
    }
}

impl<'a, R: Read> Iterator for ChunkSplitter<'a, R> {
    type Item = Result<Chunk, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source.clone();
        self.write_chunk()
            .with_context(|| format!("splitting {}", source.display()))
            .transpose()
    }
}

/// In-memory footprint estimate of a record: the record header, field bounds and field bytes.
pub(crate) fn approximate_size(record: &ByteRecord) -> u64 {
    (size_of::<ByteRecord>() + record.len() * size_of::<usize>() + record.as_slice().len()) as u64
}
