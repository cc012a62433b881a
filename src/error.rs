use std::{collections::TryReserveError, fmt, io};

use thiserror::Error;

/// The shared facilities a sort run creates, named for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facility {
    Numbers,
    Buckets,
    DoneFlag,
    WorkerSemaphores,
    CoordinatorSemaphores,
    ReportChannel,
    OffsetChannel,
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facility::Numbers => "numeric array",
            Facility::Buckets => "bucket matrix",
            Facility::DoneFlag => "completion flag",
            Facility::WorkerSemaphores => "worker semaphore group",
            Facility::CoordinatorSemaphores => "coordinator semaphore group",
            Facility::ReportChannel => "pass report channel",
            Facility::OffsetChannel => "offset assignment channel",
        };
        f.write_str(name)
    }
}

/// Command line validation failures. Nothing has been allocated when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("Not enough arguments.")]
    NotEnoughArguments,
    #[error("The base is not a number or is too large.")]
    BaseNotANumber,
    #[error("Base should be a positive number greater than 1.")]
    BaseTooSmall,
    #[error("The size is not a number or is too large.")]
    SizeNotANumber,
    #[error("The size should be a strictly positive number.")]
    SizeNotPositive,
    #[error("The size should match the real size of the array (expected {expected}, got {actual}).")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Argument {index} is not a number or is too large: '{value}'.")]
    ValueNotANumber { index: usize, value: String },
    #[error("Argument {index} is not positive: {value}.")]
    NegativeValue { index: usize, value: i64 },
}

/// Failures of a sort run: resource exhaustion while setting up, or a broken protocol while running.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("base must be greater than 1, got {0}")]
    InvalidBase(usize),
    #[error("cannot sort an empty array")]
    Empty,
    #[error("key {0} does not fit in a shared cell")]
    KeyOutOfRange(u64),
    #[error("{facility} would need more than usize::MAX cells")]
    TooLarge { facility: Facility },
    #[error("failed to allocate the {facility}: {source}")]
    Alloc {
        facility: Facility,
        #[source]
        source: TryReserveError,
    },
    #[error("failed to spawn {unit}: {source}")]
    Spawn {
        unit: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to build the unit thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("the {0} was closed while a unit depended on it")]
    FacilityClosed(Facility),
    #[error("{unit} panicked")]
    UnitPanicked { unit: String },
    #[error("{unit} never reported a result")]
    MissingResult { unit: String },
}
