//! Pipeline driver, job lifecycle and scheduling

pub mod driver;
pub mod job;
pub mod progress;
pub mod scheduler;
pub mod store;

pub use driver::{
    PartialResults, PipelineDriver, PipelineError, PipelineFailure, PipelineOptions,
    PipelineResult, RepoFailure,
};
pub use job::{Job, JobStatus};
pub use progress::{
    LogEntry, LogKind, LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler, Stage,
};
pub use scheduler::{Scheduler, StreamEvent};
pub use store::{
    InMemoryJobStore, InMemoryRepositoryStore, JobStore, Registration, RegistrationError,
    RepositoryStore,
};
