//! Cooperative cancellation for in-flight pagination runs.

mod token;

pub use token::CancellationToken;
