use std::time::{Duration, Instant, SystemTime};

use log::info;
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    step::{BatchStatus, Step, StepExecution},
};

/// Represents a job that can be executed.
///
/// A job is a container for a sequence of steps executed in order. It stops
/// at the first failing step.
///
/// # Example Usage
///
/// ```rust,no_run,compile_fail
/// use person_batch::core::job::{Job, JobBuilder};
/// use person_batch::core::step::StepBuilder;
///
/// let step = StepBuilder::new()
///     .name("csv-import-step".to_string())
///     .reader(&some_reader)
///     .writer(&some_writer)
///     .build()?;
///
/// let job = JobBuilder::new()
///     .name("importPersons".to_string())
///     .start(&step)
///     .build();
///
/// let execution = job.run();
/// ```
pub trait Job {
    /// Runs the job. A failure is reported through the returned execution,
    /// which always carries the counters of every step that ran.
    fn run(&self) -> JobExecution;
}

/// Represents one run of a job.
#[derive(Debug)]
pub struct JobExecution {
    /// Identifier of the job instance that ran
    pub id: Uuid,
    pub name: String,
    /// Wall-clock start of the run; distinguishes runs of the same job
    pub started_at: SystemTime,
    pub status: BatchStatus,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
    /// Executions of the steps that ran, in order
    pub step_executions: Vec<StepExecution>,
    /// Error of the failed step, if any
    pub error: Option<BatchError>,
}

impl JobExecution {
    /// Total items read by all steps.
    pub fn read_count(&self) -> usize {
        self.step_executions.iter().map(|s| s.read_count).sum()
    }

    /// Total items written by all steps.
    pub fn write_count(&self) -> usize {
        self.step_executions.iter().map(|s| s.write_count).sum()
    }

    /// Total chunks committed by all steps.
    pub fn commit_count(&self) -> usize {
        self.step_executions.iter().map(|s| s.commit_count).sum()
    }

    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}

/// Represents an instance of a job.
pub struct JobInstance<'a> {
    /// Unique identifier for this job instance
    id: Uuid,
    /// Human-readable name for the job
    name: String,
    /// Steps that make up this job, in execution order
    steps: Vec<&'a dyn Step>,
}

impl JobInstance<'_> {
    pub fn get_id(&self) -> Uuid {
        self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl Job for JobInstance<'_> {
    fn run(&self) -> JobExecution {
        let started_at = SystemTime::now();
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut step_executions = Vec::with_capacity(self.steps.len());
        let mut error = None;

        for step in &self.steps {
            let mut step_execution = StepExecution::new(step.get_name());
            let result = step.execute(&mut step_execution);
            step_executions.push(step_execution);

            if let Err(err) = result {
                error = Some(err);
                break;
            }
        }

        let status = if error.is_none() {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };

        info!(
            "End of job: {}, id: {}, status: {:?}",
            self.name, self.id, status
        );

        JobExecution {
            id: self.id,
            name: self.name.clone(),
            started_at,
            status,
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            step_executions,
            error,
        }
    }
}

/// Builder for creating a job instance.
///
/// # Example
///
/// ```rust,no_run,compile_fail
/// use person_batch::core::job::JobBuilder;
///
/// let job = JobBuilder::new()
///     .name("import-customers".to_string())
///     .start(&read_step)
///     .next(&write_step)
///     .build();
/// ```
#[derive(Default)]
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    /// Steps to be executed, in order
    steps: Vec<&'a dyn Step>,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            steps: Vec::new(),
        }
    }

    pub fn name(mut self, name: String) -> JobBuilder<'a> {
        self.name = Some(name);
        self
    }

    /// Sets the first step of the job.
    ///
    /// Semantically identical to `next()`; reads better for the first step.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Adds a step to the job. Steps run in the order they are added.
    pub fn next(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> JobInstance<'a> {
        JobInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::{
        BatchError,
        core::step::{BatchStatus, Step, StepExecution},
    };

    use super::{Job, JobBuilder};

    struct CountingStep {
        name: &'static str,
        items: usize,
        fail: bool,
        runs: Cell<usize>,
    }

    impl CountingStep {
        fn new(name: &'static str, items: usize, fail: bool) -> Self {
            Self {
                name,
                items,
                fail,
                runs: Cell::new(0),
            }
        }
    }

    impl Step for CountingStep {
        fn get_name(&self) -> &str {
            self.name
        }

        fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
            self.runs.set(self.runs.get() + 1);
            step_execution.read_count = self.items;
            if self.fail {
                step_execution.status = BatchStatus::Failed;
                return Err(BatchError::Parse {
                    line: 1,
                    message: format!("{} rejected its input", self.name),
                });
            }
            step_execution.write_count = self.items;
            step_execution.commit_count = 1;
            step_execution.status = BatchStatus::Completed;
            Ok(())
        }
    }

    #[test]
    fn runs_steps_in_order() {
        let first = CountingStep::new("first", 3, false);
        let second = CountingStep::new("second", 4, false);

        let job = JobBuilder::new()
            .name("test".to_string())
            .start(&first)
            .next(&second)
            .build();
        let execution = job.run();

        assert!(execution.is_completed());
        assert_eq!(execution.name, "test");
        assert_eq!(execution.id, job.get_id());
        assert_eq!(execution.step_executions.len(), 2);
        assert_eq!(execution.step_executions[1].name, "second");
        assert_eq!(execution.read_count(), 7);
        assert_eq!(execution.write_count(), 7);
        assert_eq!(execution.commit_count(), 2);
        assert!(execution.error.is_none());
    }

    #[test]
    fn stops_at_the_first_failing_step() {
        let first = CountingStep::new("first", 2, true);
        let second = CountingStep::new("second", 4, false);

        let job = JobBuilder::new().start(&first).next(&second).build();
        let execution = job.run();

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(second.runs.get(), 0);
        assert_eq!(execution.step_executions.len(), 1);
        assert_eq!(execution.read_count(), 2);
        assert_eq!(execution.write_count(), 0);
        assert!(matches!(execution.error, Some(BatchError::Parse { line: 1, .. })));
    }

    #[test]
    fn generates_a_name_when_none_is_given() {
        let job = JobBuilder::new().build();

        assert_eq!(job.get_name().len(), 8);
    }
}
