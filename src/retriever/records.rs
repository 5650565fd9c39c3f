use serde::{Deserialize, Serialize};

use crate::repository::{CategoryIndex, ImageIndex, Page, PageSet};
use crate::util::{clean_spot_name, strip_category_prefix};

/// One row of `spots.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    pub spot_id: u64,
    pub name: String,
    pub source: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_title: Option<String>,
    pub description: String,
}

/// One row of `spot_categories.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotCategoryRecord {
    pub spot_id: u64,
    pub category_name: String,
}

/// One row of `images.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub image_title: String,
    pub source: String,
    pub author: Option<String>,
    pub license: Option<String>,
}

/// The three output tables of one extraction pass.
#[derive(Debug, Default, PartialEq)]
pub struct Dataset {
    pub spots: Vec<SpotRecord>,
    pub spot_categories: Vec<SpotCategoryRecord>,
    pub images: Vec<ImageRecord>,
}

/// Single pass over `pages`: pages lacking a coordinate contribute nothing,
/// every other page yields one spot, its category rows and at most one image row.
pub fn extract(pages: &PageSet, categories: &CategoryIndex, images: &ImageIndex) -> Dataset {
    let mut dataset = Dataset::default();

    for page in pages.get() {
        let Some(spot) = extract_spot(page) else {
            continue;
        };
        dataset.spots.push(spot);
        dataset
            .spot_categories
            .extend(extract_spot_categories(page, categories));
        if let Some(image) = extract_image(page, images) {
            dataset.images.push(image);
        }
    }

    dataset
}

pub fn extract_spot(page: &Page) -> Option<SpotRecord> {
    let (latitude, longitude) = (page.latitude?, page.longitude?);

    Some(SpotRecord {
        spot_id: page.page_id,
        name: clean_spot_name(&page.title).into_owned(),
        source: page.source.clone(),
        latitude,
        longitude,
        image_title: page.image_title.clone(),
        description: page.description.clone(),
    })
}

pub fn extract_spot_categories<'a>(
    page: &'a Page,
    categories: &'a CategoryIndex,
) -> impl Iterator<Item = SpotCategoryRecord> + 'a {
    categories
        .get_categories(page)
        .iter()
        .map(move |category| SpotCategoryRecord {
            spot_id: page.page_id,
            category_name: strip_category_prefix(&category.title),
        })
}

pub fn extract_image(page: &Page, images: &ImageIndex) -> Option<ImageRecord> {
    let image = images.get_page_image(page)?;

    Some(ImageRecord {
        image_title: image.image_title.clone(),
        source: image.source.clone(),
        author: image.author.clone(),
        license: image.license.clone(),
    })
}
