//! CLI command implementations.

mod ask;
mod ingest;
mod jobs;
mod serve;

pub use ask::run_ask;
pub use ingest::run_ingest;
pub use jobs::run_jobs;
pub use serve::run_serve;
