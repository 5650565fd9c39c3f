use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::categories::CategoryIndex;
use super::types::{Page, RepositoryError};
use crate::storage::JsonCache;
use crate::wiki::{parse_responses, QueryParams, WikiApi};

const CACHE_NAME: &str = "pages.json";

/// Article details (coordinates, lead image, intro text) backed by `pages.json`.
pub struct PagesRepository {
    api: WikiApi,
    cache: JsonCache,
    chunk_size: usize,
}

impl PagesRepository {
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

    /// Fetch details for every page in `categories`, overwrite the cache, and parse.
    pub async fn update(&self, categories: &CategoryIndex) -> Result<PageSet, RepositoryError> {
        let responses = self.fetch(categories).await?;
        self.cache.dump(&responses, CACHE_NAME)?;
        PageSet::from_responses(&responses)
    }

    pub fn load(&self) -> Result<PageSet, RepositoryError> {
        if !self.is_cached() {
            return Err(RepositoryError::NotPopulated { name: CACHE_NAME });
        }
        let responses: Vec<Value> = self.cache.load(CACHE_NAME)?;
        PageSet::from_responses(&responses)
    }

    pub async fn load_or_update(
        &self,
        categories: &CategoryIndex,
    ) -> Result<PageSet, RepositoryError> {
        let responses: Vec<Value> = self
            .cache
            .load_or_fetch(CACHE_NAME, || self.fetch(categories))
            .await?;
        PageSet::from_responses(&responses)
    }

    async fn fetch(&self, categories: &CategoryIndex) -> Result<Vec<Value>, RepositoryError> {
        let ids = categories.page_ids();
        let batches = ids.len().div_ceil(self.chunk_size);
        tracing::info!(pages = ids.len(), batches = batches, "Fetching page details");

        let mut responses = Vec::new();
        for (i, chunk) in ids.chunks(self.chunk_size).enumerate() {
            tracing::debug!(batch = i + 1, of = batches, "Page detail batch");
            responses.extend(self.api.query_all(QueryParams::page_details(chunk)).await?);
        }
        Ok(responses)
    }
}

/// Populated view of `pages.json`, ordered by page id.
#[derive(Debug, Default)]
pub struct PageSet {
    pages: Vec<Page>,
}

impl PageSet {
    fn from_responses(responses: &[Value]) -> Result<Self, RepositoryError> {
        let parsed = parse_responses(responses).map_err(|source| RepositoryError::Malformed {
            name: CACHE_NAME,
            source,
        })?;

        let mut by_id: BTreeMap<u64, Page> = BTreeMap::new();
        for page in parsed
            .into_iter()
            .flat_map(|r| r.query.pages)
            .filter_map(Page::from_raw)
        {
            match by_id.get_mut(&page.page_id) {
                Some(existing) => existing.merge(page),
                None => {
                    by_id.insert(page.page_id, page);
                }
            }
        }

        Ok(Self {
            pages: by_id.into_values().collect(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_pages(mut pages: Vec<Page>) -> Self {
        pages.sort_by_key(|p| p.page_id);
        Self { pages }
    }

    pub fn get(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Distinct lead-image names across all pages, sorted.
    pub fn image_titles(&self) -> Vec<String> {
        self.pages
            .iter()
            .filter_map(|p| p.image_title.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
