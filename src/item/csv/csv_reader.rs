use csv::{ReaderBuilder, StringRecordsIntoIter, Trim};
use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
    item::csv::line_tokenizer::{DelimitedLineTokenizer, FieldSetMapper},
};

/// Default number of leading lines skipped: the header.
pub const DEFAULT_LINES_TO_SKIP: usize = 1;

type Opener<R> = Box<dyn Fn() -> io::Result<R> + Send + Sync>;

/// A delimited-file item reader that implements the `ItemReader` trait.
///
/// Each call to `read` pulls a single line from the source, names its tokens
/// with a `DelimitedLineTokenizer` and maps them onto an item with a
/// `FieldSetMapper`. Only the current line is held in memory.
///
/// # Implementation Details
///
/// - Uses a `RefCell` to provide interior mutability for the CSV record iterator
/// - Readers built with `from_path` open the file in `open` and release it in
///   `close`; opening again restarts from the first line
/// - Blank lines are ignored and do not count towards `lines_to_skip`
/// - Malformed lines abort with `BatchError::Parse` carrying the line number
///
/// # Examples
///
/// ```
/// use person_batch::item::csv::csv_reader::CsvItemReaderBuilder;
/// use person_batch::item::csv::line_tokenizer::FieldSet;
/// use person_batch::core::item::ItemReader;
/// use person_batch::BatchError;
///
/// let data = "\
/// city,country
/// Boston,United States
/// Concord,United States
/// ";
///
/// let reader = CsvItemReaderBuilder::new()
///     .names(["city", "country"])
///     .from_reader(data.as_bytes(), |fields: &FieldSet| {
///         Ok::<_, BatchError>(fields.get("city").unwrap_or_default().to_owned())
///     })
///     .unwrap();
///
/// assert_eq!(reader.read().unwrap(), Some("Boston".to_owned()));
/// assert_eq!(reader.read().unwrap(), Some("Concord".to_owned()));
/// assert_eq!(reader.read().unwrap(), None);
/// ```
pub struct CsvItemReader<R, M> {
    /// Iterator over the records of the open source, `None` while closed
    records: RefCell<Option<StringRecordsIntoIter<R>>>,
    /// Re-opens the source; absent for readers built on a caller's stream
    opener: Option<Opener<R>>,
    /// Name of the source used in error messages
    resource: String,
    tokenizer: DelimitedLineTokenizer,
    mapper: M,
    lines_to_skip: usize,
    remaining_to_skip: Cell<usize>,
}

impl<R: Read, M> CsvItemReader<R, M> {
    fn record_iter(&self, rdr: R) -> StringRecordsIntoIter<R> {
        ReaderBuilder::new()
            .trim(Trim::All)
            .delimiter(self.tokenizer.get_delimiter())
            .quote(self.tokenizer.get_quote())
            .has_headers(false) // Leading lines are skipped by count
            .flexible(true) // Token count is checked by the tokenizer
            .from_reader(rdr)
            .into_records()
    }

    fn open_source(&self) -> Result<(), BatchError> {
        if self.records.borrow().is_some() {
            return Ok(());
        }

        let opener = self.opener.as_ref().ok_or_else(|| BatchError::Resource {
            resource: self.resource.clone(),
            source: io::Error::other("stream already consumed and cannot be reopened"),
        })?;

        let rdr = opener().map_err(|source| BatchError::Resource {
            resource: self.resource.clone(),
            source,
        })?;

        self.records.replace(Some(self.record_iter(rdr)));
        self.remaining_to_skip.set(self.lines_to_skip);

        Ok(())
    }

    fn to_batch_error(&self, error: csv::Error) -> BatchError {
        let line = error.position().map_or(0, |position| position.line());
        let message = error.to_string();

        match error.into_kind() {
            csv::ErrorKind::Io(source) => BatchError::Resource {
                resource: self.resource.clone(),
                source,
            },
            _ => BatchError::Parse { line, message },
        }
    }
}

impl<R: Read, T, M: FieldSetMapper<T>> ItemReader<T> for CsvItemReader<R, M> {
    /// Reads the next item from the source.
    ///
    /// # Returns
    /// - `Ok(Some(item))` if a line is successfully read and mapped
    /// - `Ok(None)` if there are no more lines to read
    /// - `Err(BatchError::Parse)` if a line is malformed
    /// - `Err(BatchError::Resource)` if the source cannot be opened or read
    fn read(&self) -> ItemReaderResult<T> {
        if self.records.borrow().is_none() {
            self.open_source()?;
        }

        let mut records = self.records.borrow_mut();
        let Some(records) = records.as_mut() else {
            return Ok(None);
        };

        for result in records {
            let record = result.map_err(|error| self.to_batch_error(error))?;

            if self.remaining_to_skip.get() > 0 {
                self.remaining_to_skip.set(self.remaining_to_skip.get() - 1);
                continue;
            }

            let line = record.position().map_or(0, |position| position.line());
            let field_set = self.tokenizer.tokenize_record(&record, line)?;

            return self.mapper.map_field_set(&field_set).map(Some);
        }

        // No more lines in the source
        Ok(None)
    }

    fn open(&self) -> Result<(), BatchError> {
        self.open_source()
    }

    fn close(&self) -> Result<(), BatchError> {
        self.records.replace(None);
        Ok(())
    }
}

/// A builder for configuring delimited-file item reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Quote: double quote (")
/// - Strict token count: enabled
/// - Lines to skip: 1 (the header)
#[derive(Debug, Clone)]
pub struct CsvItemReaderBuilder {
    delimiter: u8,
    quote: u8,
    strict: bool,
    names: Vec<String>,
    lines_to_skip: usize,
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            strict: true,
            names: Vec::new(),
            lines_to_skip: DEFAULT_LINES_TO_SKIP,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// When disabled, short lines are padded and long lines truncated instead
    /// of failing.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the ordered field names bound to the tokens of each line.
    pub fn names<N: Into<String>>(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets how many leading lines are skipped without being parsed.
    pub fn lines_to_skip(mut self, lines_to_skip: usize) -> Self {
        self.lines_to_skip = lines_to_skip;
        self
    }

    fn tokenizer(&self) -> Result<DelimitedLineTokenizer, BatchError> {
        if self.names.is_empty() {
            return Err(BatchError::Configuration(
                "at least one field name is required".to_owned(),
            ));
        }

        Ok(DelimitedLineTokenizer::new(self.names.iter().cloned())
            .delimiter(self.delimiter)
            .quote(self.quote)
            .strict(self.strict))
    }

    /// Creates a reader over a caller-provided stream.
    ///
    /// The stream is consumed once; such a reader cannot be reopened after
    /// `close`.
    pub fn from_reader<R: Read, M>(self, rdr: R, mapper: M) -> Result<CsvItemReader<R, M>, BatchError> {
        let reader = CsvItemReader {
            records: RefCell::new(None),
            opener: None,
            resource: "stream".to_owned(),
            tokenizer: self.tokenizer()?,
            mapper,
            lines_to_skip: self.lines_to_skip,
            remaining_to_skip: Cell::new(self.lines_to_skip),
        };
        reader.records.replace(Some(reader.record_iter(rdr)));

        Ok(reader)
    }

    /// Creates a reader over a file.
    ///
    /// The file is not touched until the reader is opened, so a missing file
    /// surfaces as `BatchError::Resource` when the step starts.
    pub fn from_path<P: AsRef<Path>, M>(self, path: P, mapper: M) -> Result<CsvItemReader<File, M>, BatchError> {
        let path: PathBuf = path.as_ref().to_path_buf();

        Ok(CsvItemReader {
            records: RefCell::new(None),
            resource: path.display().to_string(),
            opener: Some(Box::new(move || File::open(&path))),
            tokenizer: self.tokenizer()?,
            mapper,
            lines_to_skip: self.lines_to_skip,
            remaining_to_skip: Cell::new(self.lines_to_skip),
        })
    }
}
