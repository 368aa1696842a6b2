use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    item::{ItemProcessor, ItemReader, ItemWriter, PassThroughProcessor},
};

/// Default number of items read, processed and written per transaction.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

// Upper bound of the up-front allocation of a chunk buffer
const MAX_PREALLOCATED_ITEMS: usize = 1024;

static PASS_THROUGH: PassThroughProcessor = PassThroughProcessor;

/// Lifecycle status shared by steps and jobs.
///
/// `NotStarted → Running → {Completed | Failed}`. Terminal states are final:
/// a new run needs a new execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Outcome of reading one chunk.
#[derive(Debug, PartialEq)]
pub enum ChunkStatus {
    /// The chunk holds `chunk_size` items; the source may have more.
    Full,
    /// The source is exhausted; the chunk may be partial or empty.
    Finished,
}

/// Bookkeeping of one step run.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Name of the executed step
    pub name: String,
    /// Current status of the step execution
    pub status: BatchStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of items successfully processed
    pub process_count: usize,
    /// Number of items successfully written
    pub write_count: usize,
    /// Number of chunks handed to the writer and committed
    pub commit_count: usize,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            status: BatchStatus::NotStarted,
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
            read_count: 0,
            process_count: 0,
            write_count: 0,
            commit_count: 0,
        }
    }
}

/// An independent, sequential phase of a job.
pub trait Step {
    fn get_name(&self) -> &str;

    /// Runs the step, recording progress in `step_execution`.
    ///
    /// Counters are meaningful even when an error is returned: they describe
    /// the work committed before the failure.
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

/// Step reading, processing and writing items in fixed-size chunks.
///
/// Each chunk is written with a single `ItemWriter::write` call, so a failure
/// loses at most the current chunk. At most `chunk_size` items are held in
/// memory at any time.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    reader: &'a dyn ItemReader<I>,
    processor: &'a dyn ItemProcessor<I, O>,
    writer: &'a dyn ItemWriter<O>,
    chunk_size: usize,
}

impl<I, O> Step for ChunkOrientedStep<'_, I, O> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        step_execution.start_time = Instant::now();
        step_execution.status = BatchStatus::Running;

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = self.run_chunks(step_execution);

        // Resources are released whatever the outcome; the first error wins.
        let result = result.and(self.close_resources());

        step_execution.end_time = Instant::now();
        step_execution.duration = step_execution.end_time - step_execution.start_time;
        step_execution.status = if result.is_ok() {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };

        info!(
            "End of step: {}, status: {:?}, read: {}, written: {}, commits: {}",
            step_execution.name,
            step_execution.status,
            step_execution.read_count,
            step_execution.write_count,
            step_execution.commit_count
        );

        result
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O> {
    fn run_chunks(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        self.reader.open()?;
        self.writer.open()?;

        let mut chunk = 0;

        loop {
            let (read_items, chunk_status) = self.read_chunk(step_execution)?;

            if read_items.is_empty() {
                return Ok(());
            }

            chunk += 1;
            let processed_items = self.process_chunk(step_execution, chunk, read_items)?;
            self.write_chunk(step_execution, chunk, &processed_items)?;

            if chunk_status == ChunkStatus::Finished {
                return Ok(());
            }
        }
    }

    fn read_chunk(
        &self,
        step_execution: &mut StepExecution,
    ) -> Result<(Vec<I>, ChunkStatus), BatchError> {
        debug!("Start reading chunk");

        let mut read_items = Vec::with_capacity(self.chunk_size.min(MAX_PREALLOCATED_ITEMS));

        while read_items.len() < self.chunk_size {
            match self.reader.read()? {
                Some(item) => {
                    read_items.push(item);
                    step_execution.read_count += 1;
                }
                None => {
                    debug!("End reading chunk: FINISHED ({} items)", read_items.len());
                    return Ok((read_items, ChunkStatus::Finished));
                }
            }
        }

        debug!("End reading chunk: FULL");
        Ok((read_items, ChunkStatus::Full))
    }

    fn process_chunk(
        &self,
        step_execution: &mut StepExecution,
        chunk: usize,
        read_items: Vec<I>,
    ) -> Result<Vec<O>, BatchError> {
        debug!("Start processing chunk {}", chunk);

        // 1-based position of the first item of this chunk within the run
        let first_position = step_execution.read_count - read_items.len() + 1;

        let processed_items = read_items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                self.processor
                    .process(item)
                    .map_err(|source| BatchError::Validation {
                        chunk,
                        position: first_position + index,
                        source,
                    })
            })
            .collect::<Result<Vec<O>, BatchError>>()?;

        step_execution.process_count += processed_items.len();
        debug!("End processing chunk {}", chunk);

        Ok(processed_items)
    }

    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        chunk: usize,
        processed_items: &[O],
    ) -> Result<(), BatchError> {
        debug!("Start writing chunk {}", chunk);

        self.writer
            .write(processed_items)
            .map_err(|source| BatchError::Storage { chunk, source })?;

        step_execution.write_count += processed_items.len();
        step_execution.commit_count += 1;

        self.writer.flush()?;

        debug!("End writing chunk {}", chunk);
        Ok(())
    }

    fn close_resources(&self) -> Result<(), BatchError> {
        let reader_closed = self.reader.close();
        let writer_closed = self.writer.close();
        reader_closed.and(writer_closed)
    }
}

/// Builder for a `ChunkOrientedStep`.
///
/// Reader and writer are mandatory. Without a processor items are written as
/// read.
pub struct StepBuilder<'a, I, O> {
    name: Option<String>,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: usize,
}

impl<I, O> Default for StepBuilder<'_, I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, I, O> StepBuilder<'a, I, O> {
    pub fn new() -> Self {
        Self {
            name: None,
            reader: None,
            processor: None,
            writer: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn reader(mut self, reader: &'a impl ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a impl ItemProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a impl ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Sets the commit interval.
    pub fn chunk(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError>
    where
        PassThroughProcessor: ItemProcessor<I, O>,
    {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk size must be greater than zero".to_owned(),
            ));
        }

        let reader = self
            .reader
            .ok_or_else(|| BatchError::Configuration("a step requires a reader".to_owned()))?;
        let writer = self
            .writer
            .ok_or_else(|| BatchError::Configuration("a step requires a writer".to_owned()))?;

        Ok(ChunkOrientedStep {
            name: self.name.unwrap_or_else(build_name),
            reader,
            processor: self.processor.unwrap_or(&PASS_THROUGH),
            writer,
            chunk_size: self.chunk_size,
        })
    }
}
