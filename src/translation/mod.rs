//! Translation cache and machine-translation providers
//!
//! The cache memoizes translated page text keyed by (document, page, lang);
//! providers implement the external translator behind an async trait.

mod cache;
mod provider;
mod types;

pub use cache::*;
pub use provider::*;
pub use types::*;
