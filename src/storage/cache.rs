use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A directory of JSON files addressed by file name.
///
/// The directory is created on the first [`dump`](JsonCache::dump), never
/// before; reading from a cache that was never written reports the file as
/// absent rather than failing.
#[derive(Debug, Clone)]
pub struct JsonCache {
    dir: PathBuf,
}

impl JsonCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, CacheError> {
        read_json(&self.path(name))
    }

    pub fn dump<T: Serialize + ?Sized>(&self, data: &T, name: &str) -> Result<(), CacheError> {
        write_json(&self.path(name), data)
    }

    /// Serve `name` from disk, or run `fetch`, persist its result and return it.
    pub async fn load_or_fetch<T, E, F, Fut>(&self, name: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.exists(name) {
            tracing::debug!(file = name, dir = %self.dir.display(), "Cache hit");
            return Ok(self.load(name)?);
        }

        tracing::debug!(file = name, dir = %self.dir.display(), "Cache miss, fetching");
        let data = fetch().await?;
        self.dump(&data, name)?;
        Ok(data)
    }
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CacheError> {
    let bytes = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| CacheError::json(path, e))
}

/// Serialize `data` as UTF-8 JSON indented by four spaces and write it to `path`.
///
/// Non-ASCII text is written as-is, not `\u` escaped. Missing parent
/// directories are created. The file is written under a temporary name and
/// renamed into place, so readers never observe a partially written file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), CacheError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)
        .map_err(|e| CacheError::json(path, e))?;
    buf.push(b'\n');

    write_atomic(path, &buf)
}

/// Write `contents` to `path` via a uniquely named sibling and a rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
    }

    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{suffix:016x}"));

    std::fs::write(&temp_path, contents).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        CacheError::io(&temp_path, e)
    })?;

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        CacheError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    #[test]
    fn test_exists_false_before_dump() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path().join("cache"));

        assert!(!cache.exists("pages.json"));
        assert!(!cache.dir().exists(), "directory is only created on write");
    }

    #[test]
    fn test_dump_creates_directory_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path().join("nested").join("cache"));
        let data = vec![json!({"query": {"pages": [{"pageid": 1}]}})];

        cache.dump(&data, "pages.json").unwrap();

        assert!(cache.exists("pages.json"));
        let loaded: Vec<Value> = cache.load("pages.json").unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_dump_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path());

        cache.dump(&vec![1, 2, 3], "n.json").unwrap();
        cache.dump(&vec![4], "n.json").unwrap();

        let loaded: Vec<i32> = cache.load("n.json").unwrap();
        assert_eq!(loaded, vec![4]);
    }

    #[test]
    fn test_written_json_is_indented_and_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        write_json(&path, &json!([{"name": "東京タワー"}])).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("東京タワー"));
        assert!(!text.contains("\\u"));
        assert!(text.contains("\n        \"name\""), "four-space indent: {text}");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_json(&dir.path().join("a.json"), &json!({})).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[test]
    fn test_load_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path());

        let result: Result<Value, _> = cache.load("absent.json");
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[test]
    fn test_load_corrupt_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let cache = JsonCache::new(dir.path());

        let result: Result<Value, _> = cache.load("bad.json");
        let err = result.unwrap_err();
        assert!(matches!(err, CacheError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[tokio::test]
    async fn test_load_or_fetch_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path());
        let mut calls = 0;

        let first: Vec<String> = cache
            .load_or_fetch("c.json", || {
                calls += 1;
                async { Ok::<_, CacheError>(vec!["fetched".to_string()]) }
            })
            .await
            .unwrap();

        let second: Vec<String> = cache
            .load_or_fetch("c.json", || async {
                Ok::<_, CacheError>(vec!["should not run".to_string()])
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(first, second);
    }
}
