use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Category, Page, RepositoryError};
use crate::storage::JsonCache;
use crate::wiki::{parse_responses, CategoryMember, QueryParams, WikiApi};

const CACHE_NAME: &str = "categories.json";

/// Raw member listing of one visited category, as stored in the cache.
#[derive(Debug, Serialize, Deserialize)]
struct CachedCategory {
    title: String,
    depth: usize,
    responses: Vec<Value>,
}

/// Category tree walker backed by `categories.json`.
pub struct CategoriesRepository {
    api: WikiApi,
    cache: JsonCache,
    roots: Vec<String>,
    max_depth: usize,
}

impl CategoriesRepository {
    pub fn new(api: WikiApi, cache: JsonCache, roots: Vec<String>, max_depth: usize) -> Self {
        Self {
            api,
            cache,
            roots,
            max_depth,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.exists(CACHE_NAME)
    }

    /// Walk the tree from the roots, overwrite the cache, and index the result.
    pub async fn update(&self) -> Result<CategoryIndex, RepositoryError> {
        let cached = self.fetch().await?;
        self.cache.dump(&cached, CACHE_NAME)?;
        CategoryIndex::from_cached(&cached)
    }

    /// Index the cached walk without touching the network.
    pub fn load(&self) -> Result<CategoryIndex, RepositoryError> {
        if !self.is_cached() {
            return Err(RepositoryError::NotPopulated { name: CACHE_NAME });
        }
        let cached: Vec<CachedCategory> = self.cache.load(CACHE_NAME)?;
        CategoryIndex::from_cached(&cached)
    }

    pub async fn load_or_update(&self) -> Result<CategoryIndex, RepositoryError> {
        let cached: Vec<CachedCategory> = self
            .cache
            .load_or_fetch(CACHE_NAME, || self.fetch())
            .await?;
        CategoryIndex::from_cached(&cached)
    }

    /// Breadth-first over subcategories, `max_depth` levels below each root.
    /// A category reachable along several paths is listed once, at its shallowest depth.
    async fn fetch(&self) -> Result<Vec<CachedCategory>, RepositoryError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        for root in &self.roots {
            if seen.insert(root.clone()) {
                queue.push_back((root.clone(), 0));
            }
        }

        let mut cached = Vec::new();
        while let Some((title, depth)) = queue.pop_front() {
            tracing::info!(category = %title, depth = depth, "Listing category members");
            let responses = self
                .api
                .query_all(QueryParams::category_members(&title))
                .await?;

            if depth < self.max_depth {
                for member in members(&responses)? {
                    if member.ns == CategoryMember::NS_CATEGORY && seen.insert(member.title.clone())
                    {
                        queue.push_back((member.title, depth + 1));
                    }
                }
            }

            cached.push(CachedCategory {
                title,
                depth,
                responses,
            });
        }

        tracing::info!(categories = cached.len(), "Category tree fetched");
        Ok(cached)
    }
}

fn members(responses: &[Value]) -> Result<Vec<CategoryMember>, RepositoryError> {
    let parsed = parse_responses(responses).map_err(|source| RepositoryError::Malformed {
        name: CACHE_NAME,
        source,
    })?;
    Ok(parsed
        .into_iter()
        .flat_map(|r| r.query.categorymembers)
        .collect())
}

/// Populated view of the category walk: which categories each page belongs to.
#[derive(Debug, Default)]
pub struct CategoryIndex {
    memberships: HashMap<u64, Vec<Category>>,
    page_ids: Vec<u64>,
    category_count: usize,
}

impl CategoryIndex {
    fn from_cached(cached: &[CachedCategory]) -> Result<Self, RepositoryError> {
        let mut memberships: HashMap<u64, Vec<Category>> = HashMap::new();

        for entry in cached {
            let category = Category {
                title: entry.title.clone(),
            };
            for member in members(&entry.responses)? {
                if member.ns != CategoryMember::NS_MAIN {
                    continue;
                }
                let categories = memberships.entry(member.pageid).or_default();
                if !categories.contains(&category) {
                    categories.push(category.clone());
                }
            }
        }

        let mut page_ids: Vec<u64> = memberships.keys().copied().collect();
        page_ids.sort_unstable();

        Ok(Self {
            memberships,
            page_ids,
            category_count: cached.len(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_page_ids(mut page_ids: Vec<u64>) -> Self {
        page_ids.sort_unstable();
        page_ids.dedup();
        Self {
            page_ids,
            ..Self::default()
        }
    }

    /// Categories `page` is a direct member of, in the order they were visited.
    pub fn get_categories(&self, page: &Page) -> &[Category] {
        self.memberships
            .get(&page.page_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every article id seen in any visited category, ascending and unique.
    pub fn page_ids(&self) -> &[u64] {
        &self.page_ids
    }

    pub fn category_count(&self) -> usize {
        self.category_count
    }
}
