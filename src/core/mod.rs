use rand::distr::{Alphanumeric, SampleString};

/// Reader, processor and writer abstractions
pub mod item;

/// Job: ordered container of steps
pub mod job;

/// Chunk-oriented step
pub mod step;

/// Generates a random name consisting of alphanumeric characters.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
