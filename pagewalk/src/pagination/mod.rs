//! Multi-page accumulation.
//!
//! A run starts at a seed page and follows next links, one page at a time,
//! until the configured minimum image count is reached or the chain ends.
//! Images are concatenated in page order. The previous link of the first
//! page and the next link of the last page are held for manual navigation.

mod runner;
mod state;

pub use runner::{run_pagination, PageVisit, PaginationRun, PaginationRunner, StopReason};
pub use state::AccumulationState;
