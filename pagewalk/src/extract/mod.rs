//! Image link and pagination link extraction.
//!
//! This module provides:
//! - `Origin` for deriving a session's resolution base and resolving raw
//!   attribute values against it
//! - `PageExtractor` for scanning one HTML document
//! - `ExtractionResult` and its JSON transport payload

mod extractor;
mod origin;
mod result;

pub use extractor::{extract_page, PageExtractor, ScanStats};
pub use origin::{fix_scheme, parse_page_url, Origin};
pub use result::{ExtractionPayload, ExtractionResult};
