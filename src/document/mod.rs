//! Document lifecycle and chunk storage
//!
//! The registry owns the document state machine; the store owns the
//! write-once chunk sets that parsing produces.

mod registry;
mod store;
mod types;

pub use registry::*;
pub use store::*;
pub use types::*;
