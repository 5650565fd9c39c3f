use std::collections::HashMap;

use serde_json::Value;

use super::pages::PageSet;
use super::types::{Image, Page, RepositoryError};
use crate::storage::JsonCache;
use crate::wiki::{parse_responses, QueryParams, WikiApi};

const CACHE_NAME: &str = "images.json";

/// File metadata for page lead images, backed by `images.json`.
pub struct ImagesRepository {
    api: WikiApi,
    cache: JsonCache,
    chunk_size: usize,
}

impl ImagesRepository {
    pub fn new(api: WikiApi, cache: JsonCache, chunk_size: usize) -> Self {
        Self {
            api,
            cache,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.exists(CACHE_NAME)
    }

    pub async fn update(&self, pages: &PageSet) -> Result<ImageIndex, RepositoryError> {
        let responses = self.fetch(pages).await?;
        self.cache.dump(&responses, CACHE_NAME)?;
        ImageIndex::from_responses(&responses)
    }

    pub fn load(&self) -> Result<ImageIndex, RepositoryError> {
        if !self.is_cached() {
            return Err(RepositoryError::NotPopulated { name: CACHE_NAME });
        }
        let responses: Vec<Value> = self.cache.load(CACHE_NAME)?;
        ImageIndex::from_responses(&responses)
    }

    pub async fn load_or_update(&self, pages: &PageSet) -> Result<ImageIndex, RepositoryError> {
        let responses: Vec<Value> = self
            .cache
            .load_or_fetch(CACHE_NAME, || self.fetch(pages))
            .await?;
        ImageIndex::from_responses(&responses)
    }

    async fn fetch(&self, pages: &PageSet) -> Result<Vec<Value>, RepositoryError> {
        let titles = pages.image_titles();
        let batches = titles.len().div_ceil(self.chunk_size);
        tracing::info!(images = titles.len(), batches = batches, "Fetching image metadata");

        let mut responses = Vec::new();
        for (i, chunk) in titles.chunks(self.chunk_size).enumerate() {
            tracing::debug!(batch = i + 1, of = batches, "Image metadata batch");
            responses.extend(self.api.query_all(QueryParams::image_details(chunk)).await?);
        }
        Ok(responses)
    }
}

/// Populated view of `images.json`, keyed by display-normalized file name.
#[derive(Debug, Default)]
pub struct ImageIndex {
    images: HashMap<String, Image>,
}

impl ImageIndex {
    fn from_responses(responses: &[Value]) -> Result<Self, RepositoryError> {
        let parsed = parse_responses(responses).map_err(|source| RepositoryError::Malformed {
            name: CACHE_NAME,
            source,
        })?;

        let images = parsed
            .iter()
            .flat_map(|r| r.query.pages.iter())
            .filter_map(Image::from_raw)
            .map(|image| (image.image_title.clone(), image))
            .collect();

        Ok(Self { images })
    }

    /// The lead image of `page`, if it has one and its metadata was found.
    pub fn get_page_image(&self, page: &Page) -> Option<&Image> {
        self.images.get(page.image_title.as_deref()?)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
