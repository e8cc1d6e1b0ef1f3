//! Forward-only tag scanning over raw HTML text.
//!
//! This module provides:
//! - `TagPattern` describing the literal delimiters of a taggable construct
//! - `find_tag` locating the next matching tag's attribute value
//! - `TagCursor`, an iterator that walks a buffer without backtracking
//!
//! This is a minimal attribute-value extractor, not an HTML parser. It only
//! looks for the literal delimiters it is given, so it tolerates arbitrary
//! and broken markup around them.

mod cursor;
mod pattern;

pub use cursor::TagCursor;
pub use pattern::{find_tag, TagMatch, TagPattern};
