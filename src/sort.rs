use std::cmp::{max, min};
use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool_builder::ThreadPoolBuilder;
use csv::{ByteRecord, QuoteStyle};
use rlimit::{getrlimit, setrlimit, Resource};
use tempfile::Builder;

use crate::column::{resolve_columns, Column};
use crate::config::Config;
use crate::error::{AtPath, SortError};
use crate::key::KeyDef;
use crate::keyed_record::KeyedRecord;
use crate::merge::merge_chunks;
use crate::sort_command::{Failure, SortCommand};
use crate::splitter::ChunkSplitter;
use crate::workspace::{chunk_reader, Workspace};

/// Sort a CSV file on disk
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use csv_file_sort::column::Column;
/// use csv_file_sort::sort::Sort;
///
/// // sort by the "age" column as numbers, then by the first column as text
/// fn sort_people(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut csv_file_sort = Sort::new(vec![input], output);
///     csv_file_sort.add_column(Column::from("age"));
///     csv_file_sort.add_column(Column::from(0));
///     csv_file_sort.with_numeric_columns(true);
///     // set the directory for intermediate results. The default is the system temp dir -
///     // std::env::temp_dir(), however, for large files it is recommended to provide a dedicated
///     // directory for intermediate files, preferably on the same file system as the output result.
///     csv_file_sort.with_tmp_dir(tmp);
///     csv_file_sort.sort()
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
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
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// A default Sort definition will use the system temporary
    /// directory as defined by std::env::temp_dir().
    /// * The default delimiter is a comma (',')
    /// * fields are quoted only when necessary
    /// * the first record of every input is a header
    /// * fields are compared as text
    /// * chunks are sorted in parallel using all available cores
    /// * input is split in chunks of about 100 MB
    /// * sorted chunks are merged two at a time
    /// * with no columns the complete record is the key
    ///
    /// Multiple input files are sorted together as if they were concatenated. The header of
    /// the first file is kept, the headers of the rest are dropped.
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf) -> Sort {
        Sort {
            input_files,
            output,
            tmp: std::env::temp_dir(),
            tasks: 0,
            delimiter: b',',
            quote_style: QuoteStyle::Necessary,
            has_header: true,
            numeric: false,
            parallel: true,
            chunk_size_bytes: 100 * 1024 * 1024,
            fan_in: 2,
            columns: vec![],
        }
    }

    /// Sort `input` and replace it with the sorted result
    pub fn in_place(input: PathBuf) -> Sort {
        Sort::new(vec![input.clone()], input)
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    /// Each run creates its own uniquely named directory under it.
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the number of tasks. The default is zero which will result in using all system cores
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// Set the field delimiter. The default is b','
    pub fn with_delimiter(&mut self, delimiter: u8) {
        self.delimiter = delimiter;
    }

    /// Set the quoting of the output. [QuoteStyle::Never] also disables quote handling when
    /// reading.
    pub fn with_quote_style(&mut self, quote_style: QuoteStyle) {
        self.quote_style = quote_style;
    }

    /// Whether the first record of each input is a header. The default is true
    pub fn with_header(&mut self, has_header: bool) {
        self.has_header = has_header;
    }

    /// Compare key fields as numbers instead of text. The default is false
    pub fn with_numeric_columns(&mut self, numeric: bool) {
        self.numeric = numeric;
    }

    /// Sort chunks in a thread pool. The default is true
    pub fn with_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// The input will be split in chunks of about 'chunk_size_bytes' bytes
    pub fn with_chunk_size_bytes(&mut self, chunk_size_bytes: u64) {
        self.chunk_size_bytes = chunk_size_bytes;
    }

    /// The input will be split in chunks of about 'chunk_size_mb' MB
    pub fn with_chunk_size_mb(&mut self, chunk_size_mb: u64) {
        self.chunk_size_bytes = chunk_size_mb * 1024 * 1024;
    }

    /// Set the number of files merged at once. The default is 2, smaller values are raised to 2
    pub fn with_fan_in(&mut self, fan_in: usize) {
        self.fan_in = fan_in;
    }

    /// Add a sort column. Columns added first take precedence
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Replace all columns with the `columns` value.
    pub fn with_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    /// Sort input files
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        let mut sources = Vec::with_capacity(self.input_files.len());
        for path in &self.input_files {
            let file = File::open(path).at_path(path)?;
            sources.push((path.clone(), file));
        }
        self.run(sources)
    }

    /// Sort CSV data read from `reader` into the output. Input files are ignored.
    pub fn sort_from<R: Read>(&self, reader: R) -> Result<(), anyhow::Error> {
        self.run(vec![(PathBuf::from("<reader>"), reader)])
    }

    /// Check whether every input file is sorted by the configured columns
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let config = self.create_config();

        let mut result = true;
        for path in &self.input_files {
            result = Self::internal_check(path, &config)?;
            if !result {
                break;
            }
        }
        Ok(result)
    }

    fn run<R: Read>(&self, sources: Vec<(PathBuf, R)>) -> Result<(), anyhow::Error> {
        let config = self.create_config();
        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let new_soft = min(max((config.fan_in() + 256) as u64, current_soft), current_hard);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        Self::set_rlimits(new_soft, current_hard)?;
        let result = Self::internal_sort(sources, &config, &self.output);
        Self::restore_rlimits(new_soft, current_soft, current_hard);
        result
    }

    /// Best effort restore of the soft limit found before the run. The limit is process wide:
    /// when it no longer holds the value this run set, another run changed it and is left to
    /// restore it. Runs that start and finish interleaved may leave the limit raised.
    fn restore_rlimits(raised_soft: u64, soft: u64, hard: u64) {
        if let Ok((current_soft, _)) = Self::get_rlimits() {
            if current_soft != raised_soft {
                log::info!("rlimit NOFILE soft changed to {} by another run, not restored", current_soft);
                return;
            }
        }
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", soft, hard);
        if let Err(e) = Self::set_rlimits(soft, hard) {
            log::warn!("Failed to restore rlimit NOFILE: {:#}", e);
        }
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    fn create_config(&self) -> Config {
        let mut tasks = self.tasks;
        if self.tasks == 0 {
            tasks = num_cpus::get();
        }

        Config::new(
            self.tmp.clone(),
            tasks,
            self.delimiter,
            self.quote_style,
            self.has_header,
            self.numeric,
            self.parallel,
            self.chunk_size_bytes,
            max(self.fan_in, 2),
            self.columns.clone(),
        )
    }

    pub(crate) fn internal_check(path: &Path, config: &Config) -> Result<bool, anyhow::Error> {
        let mut reader = config.input_reader_builder().from_path(path).at_path(path)?;
        let mut record = ByteRecord::new();
        let mut header = None;
        if config.has_header() && reader.read_byte_record(&mut record).at_path(path)? {
            header = Some(record.clone());
        }
        let key_def = KeyDef::new(resolve_columns(config.columns(), header.as_ref())?, config.numeric());

        let mut previous: Option<KeyedRecord> = None;
        let mut row = 0;
        while reader.read_byte_record(&mut record).at_path(path)? {
            row += 1;
            let current = KeyedRecord::new(record.clone(), &key_def)
                .map_err(|e| e.at_row(row))
                .with_context(|| format!("checking {}", path.display()))?;
            if let Some(previous) = &previous {
                if previous > &current {
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }

    fn internal_sort<R: Read>(sources: Vec<(PathBuf, R)>, config: &Config, output: &Path) -> Result<(), anyhow::Error> {
        log::info!("Start sort");
        let mut header: Option<ByteRecord> = None;
        let mut readers = Vec::with_capacity(sources.len());
        for (path, source) in sources {
            let mut reader = config.input_reader_builder().from_reader(source);
            if config.has_header() {
                let mut record = ByteRecord::new();
                if reader.read_byte_record(&mut record).at_path(&path)? {
                    if header.is_none() {
                        header = Some(record);
                    } else if header.as_ref() != Some(&record) {
                        log::warn!("Header of {} differs from the first header and is dropped", path.display());
                    }
                }
            }
            readers.push((path, reader));
        }

        let columns = resolve_columns(config.columns(), header.as_ref())?;
        let key_def = Arc::new(KeyDef::new(columns, config.numeric()));
        let workspace = Workspace::new(config.tmp())?;
        log::info!("Using workspace {}", workspace.path().display());

        let result = Self::split_and_sort(readers, config, &key_def, &workspace)
            .and_then(|chunks| {
                log::info!("Merging {} sorted chunks", chunks.len());
                merge_chunks(chunks, &key_def, config.fan_in(), &workspace)
            })
            .and_then(|merged| Self::write_output(header.as_ref(), merged.as_deref(), config, output));
        if result.is_err() {
            workspace.clear();
        }
        result?;
        log::info!("Finish sort");
        Ok(())
    }

    fn split_and_sort<R: Read>(readers: Vec<(PathBuf, csv::Reader<R>)>, config: &Config, key_def: &Arc<KeyDef>, workspace: &Workspace) -> Result<Vec<PathBuf>, anyhow::Error> {
        let mut chunks = Vec::new();
        if !config.parallel() {
            log::info!("Start sequential chunk sort");
            for (path, mut reader) in readers {
                for chunk in ChunkSplitter::new(&mut reader, workspace, path, config.chunk_size_bytes()) {
                    let chunk = chunk?;
                    SortCommand::sort_chunk(&chunk, key_def)?;
                    chunks.push(chunk.into_path());
                }
            }
            return Ok(chunks);
        }

        log::info!("Start parallel chunk sort, tasks: {}", config.tasks());
        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let mut sorting_pool = thread_pool_builder
            .with_name("sorting".to_string())
            .with_tasks(config.tasks())
            .with_queue_size(config.queue_size())
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()?;

        let failure: Failure = Arc::new(Mutex::new(None));
        let mut split_result = Ok(());
        'split: for (path, mut reader) in readers {
            for chunk in ChunkSplitter::new(&mut reader, workspace, path, config.chunk_size_bytes()) {
                match chunk {
                    Ok(chunk) => {
                        chunks.push(chunk.path().to_path_buf());
                        let sort_command = Box::new(SortCommand::new(chunk, key_def.clone(), failure.clone()));
                        sorting_pool.submit(sort_command);
                    }
                    Err(e) => {
                        split_result = Err(e);
                        break 'split;
                    }
                }
            }
        }

        log::info!("Shutting down sorting pool");
        sorting_pool.shutdown();
        sorting_pool.join()?;
        split_result?;

        let failed = failure
            .lock()
            .map_err(|_| anyhow!("chunk sort failure slot is poisoned"))?
            .take();
        if let Some(e) = failed {
            return Err(e);
        }
        Ok(chunks)
    }

    /// Stage the output next to the destination and move it into place once complete, so
    /// sorting in place never leaves a partial file behind.
    fn write_output(header: Option<&ByteRecord>, merged: Option<&Path>, config: &Config, output: &Path) -> Result<(), anyhow::Error> {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let existing = fs::metadata(output).ok().map(|metadata| metadata.permissions());
        let mut builder = Builder::new();
        builder.prefix(".csvsort-").suffix(".tmp");
        if existing.is_none() {
            new_file_permissions(&mut builder);
        }
        let mut staged = builder.tempfile_in(dir).at_path(dir)?;
        if let Some(permissions) = existing {
            if let Err(e) = staged.as_file().set_permissions(permissions) {
                log::warn!("Failed to copy permissions of {}: {}", output.display(), e);
            }
        }

        let mut records: usize = 0;
        {
            let mut writer = config.output_writer_builder().from_writer(staged.as_file_mut());
            if let Some(header) = header {
                writer.write_byte_record(header).at_path(output)?;
            }
            if let Some(merged) = merged {
                let mut reader = chunk_reader(merged)?;
                let mut record = ByteRecord::new();
                while reader.read_byte_record(&mut record).at_path(merged)? {
                    writer.write_byte_record(&record).at_path(output)?;
                    records += 1;
                }
            }
            writer.flush().at_path(output)?;
        }
        staged.persist(output).map_err(|e| SortError::io(output, e.error))?;

        if let Some(merged) = merged {
            fs::remove_file(merged).at_path(merged)?;
        }
        log::info!("Wrote {}, records: {}", output.display(), records);
        Ok(())
    }
}

/// A new destination gets the mode of a plainly created file, 0o666 less the umask,
/// instead of the owner only mode of a temporary file.
#[cfg(unix)]
fn new_file_permissions(builder: &mut Builder<'_, '_>) {
    use std::os::unix::fs::PermissionsExt;
    builder.permissions(fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn new_file_permissions(_builder: &mut Builder<'_, '_>) {}
