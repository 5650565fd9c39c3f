use crate::storage::CacheError;
use crate::util::{display_file_name, strip_html_tags, strip_namespace};
use crate::wiki::{HttpError, RawPage};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// `load()` was called before any `update()` wrote the cache file.
    #[error("'{name}' is not in the cache yet; it must be fetched before it can be loaded")]
    NotPopulated { name: &'static str },

    #[error("Unexpected API response shape in '{name}': {source}")]
    Malformed {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Entities
// ============================================================================

/// A category in prefixed form (`Category:X`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub title: String,
}

/// An encyclopedia article as the retriever sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page_id: u64,
    pub title: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Lead image, display-normalized (`Tokyo Tower.jpg`, no namespace).
    pub image_title: Option<String>,
    pub description: String,
    /// Canonical article URL.
    pub source: String,
}

impl Page {
    /// `None` for entries without a page id (missing or invalid pages).
    pub(crate) fn from_raw(raw: RawPage) -> Option<Self> {
        let page_id = raw.pageid.filter(|_| !raw.missing)?;
        let coordinate = raw.coordinates.first().copied();

        Some(Self {
            page_id,
            title: raw.title,
            latitude: coordinate.map(|c| c.lat),
            longitude: coordinate.map(|c| c.lon),
            image_title: raw
                .pageimage
                .as_deref()
                .map(|name| display_file_name(name).into_owned()),
            description: raw.extract.map(|e| e.trim().to_string()).unwrap_or_default(),
            source: raw.fullurl.unwrap_or_default(),
        })
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Fill fields this copy lacks from another response for the same page.
    pub(crate) fn merge(&mut self, other: Page) {
        if self.latitude.is_none() || self.longitude.is_none() {
            self.latitude = other.latitude;
            self.longitude = other.longitude;
        }
        if self.image_title.is_none() {
            self.image_title = other.image_title;
        }
        if self.description.is_empty() {
            self.description = other.description;
        }
        if self.source.is_empty() {
            self.source = other.source;
        }
    }
}

/// A file with its download URL and attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Display-normalized file name, matching [`Page::image_title`].
    pub image_title: String,
    pub source: String,
    pub author: Option<String>,
    pub license: Option<String>,
}

impl Image {
    /// `None` when the file has no `imageinfo` (deleted or never existed).
    pub(crate) fn from_raw(raw: &RawPage) -> Option<Self> {
        let info = raw.imageinfo.first()?;
        if info.url.is_empty() {
            return None;
        }

        let name = strip_namespace(&raw.title);
        Some(Self {
            image_title: display_file_name(name).into_owned(),
            source: info.url.clone(),
            author: info
                .meta("Artist")
                .map(|artist| strip_html_tags(&artist).into_owned())
                .filter(|artist| !artist.is_empty()),
            license: info.meta("LicenseShortName"),
        })
    }
}
