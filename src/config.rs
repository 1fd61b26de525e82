use std::path::PathBuf;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};

use crate::column::Column;

#[derive(Clone, Debug)]
pub(crate) struct Config {
    tmp: PathBuf,
    tasks: usize,
    queue_size: usize,
    delimiter: u8,
    quote_style: QuoteStyle,
    has_header: bool,
    numeric: bool,
    parallel: bool,
    chunk_size_bytes: u64,
    fan_in: usize,
    columns: Vec<Column>,
}

impl Config {
    pub(crate) fn new(
        tmp: PathBuf,
        tasks: usize,
        delimiter: u8,
        quote_style: QuoteStyle,
        has_header: bool,
        numeric: bool,
        parallel: bool,
        chunk_size_bytes: u64,
        fan_in: usize,
        columns: Vec<Column>,
    ) -> Config {
        let queue_size = 4096;
        Config {
            tmp,
            tasks,
            queue_size,
            delimiter,
            quote_style,
            has_header,
            numeric,
            parallel,
            chunk_size_bytes,
            fan_in,
            columns,
        }
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tasks(&self) -> usize {
        self.tasks
    }

    pub(crate) fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub(crate) fn has_header(&self) -> bool {
        self.has_header
    }

    pub(crate) fn numeric(&self) -> bool {
        self.numeric
    }

    pub(crate) fn parallel(&self) -> bool {
        self.parallel
    }

    pub(crate) fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_bytes
    }

    pub(crate) fn fan_in(&self) -> usize {
        self.fan_in
    }

    pub(crate) fn columns(&self) -> &Vec<Column> {
        &self.columns
    }

    /// Reader for user supplied input. Headers are handled by the pipeline, never by csv.
    pub(crate) fn input_reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .quoting(!matches!(self.quote_style, QuoteStyle::Never));
        builder
    }

    /// Writer for the final output
    pub(crate) fn output_writer_builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote_style(self.quote_style)
            .has_headers(false)
            .flexible(true);
        builder
    }
}
