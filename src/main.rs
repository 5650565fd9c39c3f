use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wiki_spots::config::Config;
use wiki_spots::repository::RepositoryError;
use wiki_spots::retriever::{Refresh, Retriever};

#[derive(Parser, Debug)]
#[command(
    name = "wiki-spots",
    version,
    about = "Collect tourist spots, categories and images from Wikipedia"
)]
struct Args {
    /// Path to the TOML config file (missing file = defaults)
    #[arg(long, value_name = "FILE", default_value = "wiki-spots.toml")]
    config: PathBuf,

    /// Re-fetch everything from the API and overwrite the caches
    #[arg(long, conflicts_with = "resume")]
    update: bool,

    /// Fetch only the entity types that have no cache file yet
    #[arg(long)]
    resume: bool,
}

impl Args {
    fn refresh(&self) -> Refresh {
        if self.resume {
            Refresh::Missing
        } else {
            Refresh::from(self.update)
        }
    }
}

/// Point at the flags that fill the cache when a cache-only run finds it empty.
fn with_cli_hint(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<RepositoryError>() {
        Some(RepositoryError::NotPopulated { .. }) => {
            err.context("Nothing cached yet: run with --update (or --resume) first")
        }
        _ => err,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from '{}'", args.config.display()))?;

    let retriever = Retriever::from_config(&config)?;
    let summary = retriever
        .retrieve(args.refresh())
        .await
        .map_err(with_cli_hint)?;

    println!(
        "Wrote {} spots, {} spot categories and {} images to {}",
        summary.spots,
        summary.spot_categories,
        summary.images,
        config.output_dir.display()
    );
    println!(
        "Downloaded {} image files to {}",
        summary.downloaded,
        config.image_dir.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["wiki-spots"]);
        assert_eq!(args.config, PathBuf::from("wiki-spots.toml"));
        assert_eq!(args.refresh(), Refresh::Never);
    }

    #[test]
    fn test_update_flag() {
        let args = Args::parse_from(["wiki-spots", "--update", "--config", "alt.toml"]);
        assert_eq!(args.config, PathBuf::from("alt.toml"));
        assert_eq!(args.refresh(), Refresh::Always);
    }

    #[test]
    fn test_resume_flag() {
        let args = Args::parse_from(["wiki-spots", "--resume"]);
        assert_eq!(args.refresh(), Refresh::Missing);
    }

    #[test]
    fn test_cli_hint_added_for_empty_cache() {
        let err = with_cli_hint(RepositoryError::NotPopulated { name: "categories.json" }.into());
        let message = format!("{err:#}");
        assert!(message.starts_with("Nothing cached yet: run with --update"));
        assert!(message.contains("categories.json"));
    }

    #[test]
    fn test_cli_hint_not_added_for_other_errors() {
        let err = with_cli_hint(anyhow::anyhow!("HTTP error: status 503"));
        assert_eq!(format!("{err:#}"), "HTTP error: status 503");
    }

    #[test]
    fn test_update_and_resume_conflict() {
        assert!(Args::try_parse_from(["wiki-spots", "--update", "--resume"]).is_err());
    }
}
