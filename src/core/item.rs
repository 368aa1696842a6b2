use crate::error::{BatchError, StorageError, ValidationError};

/// Result of a single read: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Result of processing one item.
pub type ItemProcessorResult<O> = Result<O, ValidationError>;

/// Result of writing one chunk.
pub type ItemWriterResult = Result<(), StorageError>;

/// Retrieves input for a step, one item at a time.
///
/// Readers are pulled incrementally by the step. They own their underlying
/// resource between `open` and `close`.
pub trait ItemReader<I> {
    /// Reads the next item, or `Ok(None)` when there is nothing left.
    fn read(&self) -> ItemReaderResult<I>;

    /// Acquires the underlying resource. Called once before the first read.
    fn open(&self) -> Result<(), BatchError> {
        Ok(())
    }

    /// Releases the underlying resource. Called on every exit path of a step.
    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Business logic applied to every item between read and write.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: I) -> ItemProcessorResult<O>;
}

/// Output of a step, one chunk of items at a time.
///
/// A call to `write` is one unit of work: either every item of the slice is
/// persisted or none is.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn open(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Processor returning every item unchanged.
#[derive(Default)]
pub struct PassThroughProcessor;

impl<I> ItemProcessor<I, I> for PassThroughProcessor {
    fn process(&self, item: I) -> ItemProcessorResult<I> {
        Ok(item)
    }
}
