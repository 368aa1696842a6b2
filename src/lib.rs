#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Person Batch

 Chunk-oriented import of person records from a delimited text file into a
 SQLite `person` table, with first and last names uppercased on the way.

 ## Core Concepts

- **Job:** the whole import, composed of one or more `Step`s. Running a job yields a `JobExecution`.
- **Step:** a chunk-oriented phase that reads up to `chunk_size` items, processes every one of them and hands the chunk to the writer as a single transaction.
- **ItemReader:** retrieves input one item at a time (`CsvItemReader` for delimited files).
- **ItemProcessor:** business logic applied to each item (`UpperCaseNameProcessor`).
- **ItemWriter:** persists a whole chunk or nothing (`SqliteItemWriter`).

 A chunk is the unit of atomicity. Chunks committed before a failure stay
 committed; the failing chunk leaves no rows behind; later chunks are never
 read.

 ## Features

| **Feature** | **Description**                                                  |
|-------------|------------------------------------------------------------------|
| server      | HTTP trigger endpoint (`POST /jobs/import-persons`) and the binary |

 ## Getting Started

```rust
# use person_batch::{
#     core::{
#         item::{ItemWriter, ItemWriterResult},
#         job::{Job, JobBuilder},
#         step::{BatchStatus, StepBuilder},
#     },
#     item::csv::csv_reader::CsvItemReaderBuilder,
#     person::{FIELD_NAMES, Person, PersonFieldSetMapper, UpperCaseNameProcessor},
#     BatchError,
# };
# use std::cell::RefCell;
# #[derive(Default)]
# struct MemoryWriter {
#     chunks: RefCell<Vec<Vec<Person>>>,
# }
# impl ItemWriter<Person> for MemoryWriter {
#     fn write(&self, items: &[Person]) -> ItemWriterResult {
#         self.chunks.borrow_mut().push(items.to_vec());
#         Ok(())
#     }
# }
fn main() -> Result<(), BatchError> {
    let csv = "userId,firstName,lastName,gender,email,phone,dateOfBirth,jobTitle
1,John,Doe,Male,a@b.com,555-1,1990-01-01,Eng
2,Jane,Roe,Female,c@d.com,555-2,1985-05-05,Ops
3,Ada,Lovelace,Female,e@f.com,555-3,1815-12-10,Math";

    let reader = CsvItemReaderBuilder::new()
        .names(FIELD_NAMES)
        .lines_to_skip(1)
        .from_reader(csv.as_bytes(), PersonFieldSetMapper)?;

    let processor = UpperCaseNameProcessor;
    let writer = MemoryWriter::default();

    let step = StepBuilder::new()
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .chunk(2)
        .build()?;

    let job = JobBuilder::new().start(&step).build();
    let execution = job.run();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(execution.write_count(), 3);
    assert_eq!(writer.chunks.borrow().len(), 2);
    assert_eq!(writer.chunks.borrow()[1][0].last_name.as_deref(), Some("LOVELACE"));

    Ok(())
}
```
 */

/// Environment driven configuration
pub mod config;

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Item readers and writers
pub mod item;

/// Assembly of the person import job
pub mod launcher;

pub mod person;

/// HTTP trigger for the person import
#[cfg(feature = "server")]
pub mod server;
