//! The retrieve-and-dump pipeline.
//!
//! A run populates the three repositories (or reads their caches), extracts
//! spot, spot-category and image rows in one pass over the pages, writes them
//! as JSON arrays, and finally downloads the images the rows reference.

mod download;
mod records;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::repository::{
    CategoriesRepository, CategoryIndex, ImageIndex, ImagesRepository, PageSet, PagesRepository,
};
use crate::storage::{write_json, JsonCache};
use crate::wiki::{HttpClient, WikiApi};

pub use download::{image_path, save_images};
pub use records::{
    extract, extract_image, extract_spot, extract_spot_categories, Dataset, ImageRecord,
    SpotCategoryRecord, SpotRecord,
};

pub const SPOTS_FILE: &str = "spots.json";
pub const SPOT_CATEGORIES_FILE: &str = "spot_categories.json";
pub const IMAGES_FILE: &str = "images.json";

/// When a run goes to the network for entity data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Refresh {
    /// Read every cache; fail if one is missing.
    #[default]
    Never,
    /// Fetch only the entity types whose cache file is absent.
    Missing,
    /// Fetch everything and overwrite the caches.
    Always,
}

impl From<bool> for Refresh {
    fn from(should_update: bool) -> Self {
        if should_update {
            Refresh::Always
        } else {
            Refresh::Never
        }
    }
}

/// Row and file counts of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrieveSummary {
    pub spots: usize,
    pub spot_categories: usize,
    pub images: usize,
    pub downloaded: usize,
}

pub struct Retriever {
    categories: CategoriesRepository,
    pages: PagesRepository,
    images: ImagesRepository,
    downloader: HttpClient,
    output_dir: PathBuf,
    image_dir: PathBuf,
}

impl Retriever {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::new(&config.http()).context("Failed to build HTTP client")?;
        let api = WikiApi::new(http.clone(), config.api_url.clone());
        let cache = JsonCache::new(&config.cache_dir);

        Ok(Self {
            categories: CategoriesRepository::new(
                api.clone(),
                cache.clone(),
                config.root_categories.clone(),
                config.max_depth,
            ),
            pages: PagesRepository::new(api.clone(), cache.clone(), config.pages_per_request),
            images: ImagesRepository::new(api, cache, config.images_per_request),
            downloader: http.with_delay(config.download_delay()),
            output_dir: config.output_dir.clone(),
            image_dir: config.image_dir.clone(),
        })
    }

    /// Populate or load the repositories, write the three JSON files, download images.
    ///
    /// Any HTTP or filesystem error aborts the run. Cache files written by
    /// earlier stages are kept, so `Refresh::Missing` can pick up where a
    /// failed run stopped.
    pub async fn retrieve(&self, refresh: Refresh) -> Result<RetrieveSummary> {
        let (categories, pages, images) = self.populate(refresh).await?;

        let dataset = extract(&pages, &categories, &images);
        tracing::info!(
            pages = pages.len(),
            spots = dataset.spots.len(),
            spot_categories = dataset.spot_categories.len(),
            images = dataset.images.len(),
            "Extracted tourism info"
        );

        self.write_dataset(&dataset)?;

        let downloaded = save_images(&self.downloader, &dataset.images, &self.image_dir).await?;

        Ok(RetrieveSummary {
            spots: dataset.spots.len(),
            spot_categories: dataset.spot_categories.len(),
            images: dataset.images.len(),
            downloaded,
        })
    }

    async fn populate(&self, refresh: Refresh) -> Result<(CategoryIndex, PageSet, ImageIndex)> {
        let populated = match refresh {
            Refresh::Never => {
                let categories = self.categories.load()?;
                let pages = self.pages.load()?;
                let images = self.images.load()?;
                (categories, pages, images)
            }
            Refresh::Missing => {
                let categories = self.categories.load_or_update().await?;
                let pages = self.pages.load_or_update(&categories).await?;
                let images = self.images.load_or_update(&pages).await?;
                (categories, pages, images)
            }
            Refresh::Always => {
                tracing::info!("Refreshing all caches from the API");
                let categories = self
                    .categories
                    .update()
                    .await
                    .context("Failed to update categories")?;
                let pages = self
                    .pages
                    .update(&categories)
                    .await
                    .context("Failed to update pages")?;
                let images = self
                    .images
                    .update(&pages)
                    .await
                    .context("Failed to update images")?;
                (categories, pages, images)
            }
        };
        Ok(populated)
    }

    fn write_dataset(&self, dataset: &Dataset) -> Result<()> {
        self.write_output(SPOTS_FILE, &dataset.spots)?;
        self.write_output(SPOT_CATEGORIES_FILE, &dataset.spot_categories)?;
        self.write_output(IMAGES_FILE, &dataset.images)
    }

    fn write_output<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<()> {
        let path = self.output_dir.join(name);
        write_json(&path, rows).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "Wrote output");
        Ok(())
    }
}
