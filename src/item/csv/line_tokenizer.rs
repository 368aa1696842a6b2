use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::BatchError;

/// Tokens of one line, addressed by field name.
///
/// Names are matched case-insensitively, so a mapper asking for `firstName`
/// also finds a column declared as `FIRSTNAME` or `firstname`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    names: Arc<[String]>,
    values: Vec<String>,
    line: u64,
}

impl FieldSet {
    /// Value bound to `name`, or `None` when no field has that name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(name))
            .map(|index| self.values[index].as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 1-based line of the source the tokens come from.
    pub fn line(&self) -> u64 {
        self.line
    }
}

/// Maps the tokens of one line onto an item.
pub trait FieldSetMapper<T> {
    fn map_field_set(&self, field_set: &FieldSet) -> Result<T, BatchError>;
}

impl<T, F> FieldSetMapper<T> for F
where
    F: Fn(&FieldSet) -> Result<T, BatchError>,
{
    fn map_field_set(&self, field_set: &FieldSet) -> Result<T, BatchError> {
        self(field_set)
    }
}

/// Splits delimited lines into positional tokens and names them.
///
/// Token *i* is bound to name *i*. Tokens are trimmed and may be quoted.
///
/// In strict mode (the default) the token count must equal the number of
/// names. In lenient mode missing trailing tokens are bound to an empty
/// string and extra tokens are dropped.
///
/// # Examples
///
/// ```
/// use person_batch::item::csv::line_tokenizer::DelimitedLineTokenizer;
///
/// let tokenizer = DelimitedLineTokenizer::new(["id", "name", "city"]).strict(false);
///
/// let field_set = tokenizer.tokenize("7, Ada").unwrap();
/// assert_eq!(field_set.get("name"), Some("Ada"));
/// assert_eq!(field_set.get("city"), Some(""));
/// ```
#[derive(Debug, Clone)]
pub struct DelimitedLineTokenizer {
    delimiter: u8,
    quote: u8,
    strict: bool,
    names: Arc<[String]>,
}

impl DelimitedLineTokenizer {
    pub fn new<N: Into<String>>(names: impl IntoIterator<Item = N>) -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            strict: true,
            names: names.into_iter().map(Into::into).collect(),
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

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn get_delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn get_quote(&self) -> u8 {
        self.quote
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Tokenizes a single raw line.
    pub fn tokenize(&self, line: &str) -> Result<FieldSet, BatchError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .from_reader(line.as_bytes());

        let mut record = StringRecord::new();
        reader
            .read_record(&mut record)
            .map_err(|error| BatchError::Parse {
                line: 1,
                message: error.to_string(),
            })?;

        self.tokenize_record(&record, 1)
    }

    /// Names the tokens of a record already split by a CSV reader.
    pub fn tokenize_record(&self, record: &StringRecord, line: u64) -> Result<FieldSet, BatchError> {
        let expected = self.names.len();
        let found = record.len();

        if self.strict && found != expected {
            return Err(BatchError::Parse {
                line,
                message: format!("expected {expected} tokens but found {found}"),
            });
        }

        let mut values: Vec<String> = record.iter().take(expected).map(str::to_owned).collect();
        values.resize(expected, String::new());

        Ok(FieldSet {
            names: Arc::clone(&self.names),
            values,
            line,
        })
    }
}
