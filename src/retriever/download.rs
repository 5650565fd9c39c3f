use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::records::ImageRecord;
use crate::storage::write_atomic;
use crate::util::sanitize_file_name;
use crate::wiki::HttpClient;

/// Download every image in `images` into `dir`, one request at a time.
///
/// Files are named after the image title. An image shared by several spots is
/// fetched once. The first failed download aborts the batch; files already
/// written stay on disk.
///
/// Returns the number of files written.
pub async fn save_images(client: &HttpClient, images: &[ImageRecord], dir: &Path) -> Result<usize> {
    if images.is_empty() {
        return Ok(0);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create image directory '{}'", dir.display()))?;

    let mut done: HashSet<&str> = HashSet::new();
    let total = images.len();

    for (i, image) in images.iter().enumerate() {
        if !done.insert(image.image_title.as_str()) {
            continue;
        }

        tracing::info!(
            image = %image.image_title,
            current = i + 1,
            total = total,
            "Downloading image"
        );

        let bytes = client
            .get_bytes(&image.source)
            .await
            .with_context(|| format!("Failed to download image \"{}\"", image.image_title))?;

        let path = image_path(dir, &image.image_title);
        write_atomic(&path, &bytes)
            .with_context(|| format!("Failed to save image \"{}\"", image.image_title))?;
    }

    Ok(done.len())
}

pub fn image_path(dir: &Path, image_title: &str) -> PathBuf {
    dir.join(sanitize_file_name(image_title))
}
