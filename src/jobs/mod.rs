//! Background job schedulers
//!
//! Parse and translation jobs run as independent tokio tasks, bounded by
//! per-scheduler semaphores. Dedup is enforced through compare-and-set
//! claims on the durable rows, never through in-process lock registries,
//! so duplicate triggers are race-free no-ops. Handlers enqueue and return
//! immediately; job outcomes are only ever observed through the registry
//! and cache status reads.

mod parse;
mod translate;

pub use parse::*;
pub use translate::*;
