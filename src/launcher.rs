//! Wiring of the person import job.

use std::{sync::Arc, time::UNIX_EPOCH};

use log::{error, info};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    BatchError,
    config::BatchConfig,
    core::{
        job::{Job, JobBuilder, JobExecution},
        step::{BatchStatus, ChunkOrientedStep, StepBuilder},
    },
    item::{csv::csv_reader::CsvItemReaderBuilder, rdbc::SqliteItemWriterBuilder},
    person::{
        PERSON_COLUMNS, Person, PersonBinder, PersonFieldSetMapper, UpperCaseNameProcessor,
        repository::PERSON_TABLE,
    },
};

/// Name of the import job.
pub const JOB_NAME: &str = "importPersons";

/// Name of the single chunk-oriented step of the import job.
pub const STEP_NAME: &str = "csv-import-step";

/// Builds and runs the person import: CSV file → uppercase names → `person`
/// table.
///
/// Every call to `run` is a new run over the whole file with fresh reader,
/// writer and job instances. Runs are not coordinated with each other.
#[derive(Clone)]
pub struct PersonImportLauncher {
    config: Arc<BatchConfig>,
    pool: SqlitePool,
}

impl PersonImportLauncher {
    pub fn new(config: BatchConfig, pool: SqlitePool) -> Self {
        Self {
            config: Arc::new(config),
            pool,
        }
    }

    /// Runs the import to completion or to its first error.
    ///
    /// Blocks the calling thread; call it from a multi-threaded tokio runtime,
    /// directly or through `spawn_blocking`. On a current-thread runtime the
    /// first chunk fails with `BatchError::Storage`.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Configuration` when the job cannot be assembled.
    /// Failures during the run are reported through the returned execution.
    pub fn run(&self) -> Result<JobExecution, BatchError> {
        let delimiter = self
            .config
            .delimiter_byte()
            .map_err(|e| BatchError::Configuration(e.to_string()))?;

        let reader = CsvItemReaderBuilder::new()
            .delimiter(delimiter)
            .strict(self.config.strict)
            .names(self.config.field_names.iter().cloned())
            .lines_to_skip(self.config.lines_to_skip)
            .from_path(&self.config.input_path, PersonFieldSetMapper)?;

        let processor = UpperCaseNameProcessor;

        let binder = PersonBinder;
        let writer = PERSON_COLUMNS
            .iter()
            .fold(
                SqliteItemWriterBuilder::<Person>::new()
                    .pool(&self.pool)
                    .table(PERSON_TABLE)
                    .item_binder(&binder),
                |builder, column| builder.add_column(column),
            )
            .build()?;

        let step: ChunkOrientedStep<Person, Person> = StepBuilder::new()
            .name(STEP_NAME.to_owned())
            .reader(&reader)
            .processor(&processor)
            .writer(&writer)
            .chunk(self.config.chunk_size)
            .build()?;

        let job = JobBuilder::new()
            .name(JOB_NAME.to_owned())
            .start(&step)
            .build();

        info!(
            "Importing persons from {} in chunks of {}",
            self.config.input_path.display(),
            self.config.chunk_size
        );

        let execution = job.run();

        match &execution.error {
            Some(err) => error!(
                "Job {} ({}) failed after writing {} persons: {}",
                execution.name,
                execution.id,
                execution.write_count(),
                err
            ),
            None => info!(
                "Job {} ({}) imported {} persons in {:?}",
                execution.name,
                execution.id,
                execution.write_count(),
                execution.duration
            ),
        }

        Ok(execution)
    }
}

/// Summary of a run, as reported to the caller that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: Uuid,
    pub job_name: String,
    /// Start of the run in milliseconds since the Unix epoch
    pub start_at: u64,
    pub status: BatchStatus,
    pub read_count: usize,
    pub write_count: usize,
    pub commit_count: usize,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl From<&JobExecution> for JobReport {
    fn from(execution: &JobExecution) -> Self {
        let start_at = execution
            .started_at
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        Self {
            job_id: execution.id,
            job_name: execution.name.clone(),
            start_at,
            status: execution.status,
            read_count: execution.read_count(),
            write_count: execution.write_count(),
            commit_count: execution.commit_count(),
            duration_ms: u64::try_from(execution.duration.as_millis()).unwrap_or(u64::MAX),
            error: execution.error.as_ref().map(ToString::to_string),
        }
    }
}
