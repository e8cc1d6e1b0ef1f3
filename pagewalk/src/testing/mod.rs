//! Testing utilities for pagewalk.
//!
//! This module provides:
//! - An in-memory scripted fetcher
//! - HTML and image fixtures

mod fetcher;
mod fixtures;

pub use fetcher::{RecordedRequest, ScriptedFetcher};
pub use fixtures::{gallery_page, png_bytes, GalleryPage};
