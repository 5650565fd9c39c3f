//! Cache-backed repositories, one per entity type.
//!
//! Each repository pairs a [`WikiApi`](crate::wiki::WikiApi) with a
//! [`JsonCache`](crate::storage::JsonCache) and splits population from
//! consumption:
//!
//! - `update(..)` always fetches, overwrites the cache file and returns a
//!   populated handle
//! - `load()` only reads the cache and fails with
//!   [`RepositoryError::NotPopulated`] when there is nothing to read
//! - `load_or_update(..)` reads when cached and fetches otherwise
//!
//! The handles ([`CategoryIndex`], [`PageSet`], [`ImageIndex`]) are the only
//! way to reach parsed entities, so consuming a repository that was never
//! populated is an error at the call site instead of an empty result.
//!
//! Updates run in dependency order: the page query needs the page ids found in
//! the category walk, and the image query needs the lead images of those pages.

mod categories;
mod images;
mod pages;
mod types;

pub use categories::{CategoriesRepository, CategoryIndex};
pub use images::{ImageIndex, ImagesRepository};
pub use pages::{PageSet, PagesRepository};
pub use types::{Category, Image, Page, RepositoryError};
