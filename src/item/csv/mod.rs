//! Delimited text support for reading flat files.
//!
//! Reading happens in two stages:
//!
//! 1. **DelimitedLineTokenizer** splits a line into tokens and binds token *i*
//!    to the *i*-th configured field name, producing a `FieldSet`.
//! 2. A **FieldSetMapper** turns the `FieldSet` into an item.
//!
//! **CsvItemReader** drives both stages for every line of a file or stream,
//! one line per `read` call, after skipping a configurable number of header
//! lines.
//!
//! # Examples
//!
//! ```
//! use person_batch::item::csv::csv_reader::CsvItemReaderBuilder;
//! use person_batch::item::csv::line_tokenizer::FieldSet;
//! use person_batch::core::item::ItemReader;
//! use person_batch::BatchError;
//!
//! #[derive(Debug, PartialEq)]
//! struct City {
//!     name: String,
//!     pop: u32,
//! }
//!
//! fn to_city(fields: &FieldSet) -> Result<City, BatchError> {
//!     let pop = fields.get("pop").unwrap_or_default();
//!     Ok(City {
//!         name: fields.get("name").unwrap_or_default().to_owned(),
//!         pop: pop.parse().map_err(|_| BatchError::Parse {
//!             line: fields.line(),
//!             message: format!("invalid population {pop}"),
//!         })?,
//!     })
//! }
//!
//! let csv_data = "\
//! name;pop
//! Boston;4628910
//! Concord;42695
//! ";
//!
//! let reader = CsvItemReaderBuilder::new()
//!     .delimiter(b';')
//!     .names(["name", "pop"])
//!     .from_reader(csv_data.as_bytes(), to_city)
//!     .unwrap();
//!
//! let boston = reader.read().unwrap().unwrap();
//! assert_eq!(boston, City { name: "Boston".to_owned(), pop: 4628910 });
//! ```

/// A module providing facilities for reading delimited records.
pub mod csv_reader;

/// A module splitting lines into named fields.
pub mod line_tokenizer;
