pub mod catalog;
pub mod driver;
pub mod error;
pub mod models;
pub mod normalize;
pub mod planner;

pub use catalog::{Completion, CompletionStore, FsCatalog, MemoryCatalog};
pub use driver::{Dispatcher, Driver, JobFailure, RunOptions, RunSummary};
pub use error::PipelineError;
pub use models::{
    split_by_protagonist, JobKey, RecordingId, Service, SpeakerType, Timeframe, Word,
};
pub use normalize::{normalize, NormalizeOptions};
pub use planner::{
    desired_jobs, plan_chunks, plan_outstanding, reconcile, ChunkPlan, ChunkSpec, ComputeTier,
    ReconciliationPlan,
};
