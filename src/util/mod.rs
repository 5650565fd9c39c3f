//! Text helpers shared by the repositories and the retriever.
//!
//! - **Title cleaning**: spot names without disambiguation suffixes, category
//!   names without their namespace prefix
//! - **File names**: MediaWiki display normalization and filesystem-safe names
//! - **Attribution**: plain text from the HTML in Commons metadata fields

mod text;

pub use text::{
    clean_spot_name, display_file_name, sanitize_file_name, strip_category_prefix,
    strip_html_tags, strip_namespace,
};
