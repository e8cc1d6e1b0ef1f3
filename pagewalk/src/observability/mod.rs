//! Logging setup and pagination observers.

mod observer;
mod subscriber;

pub use observer::{
    LoggingPaginationObserver, NoOpPaginationObserver, PageTimer, PaginationObserver,
};
pub use subscriber::{init_tracing, LogFormat};
