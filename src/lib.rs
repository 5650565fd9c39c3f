//! Collect tourist spots from a MediaWiki category tree.
//!
//! The pipeline walks the category tree below configured roots, queries the
//! coordinates, lead image and intro text of every article found, resolves
//! lead-image metadata, and writes three JSON tables plus the image files.
//! Raw API responses are cached on disk so later runs can skip the network.

pub mod config;
pub mod repository;
pub mod retriever;
pub mod storage;
pub mod util;
pub mod wiki;
