//! Typed views over `action=query` responses (`formatversion=2`).
//!
//! The cache stores responses as raw JSON; these structs are only applied when
//! a repository turns cached responses into entities. Every field defaults so
//! that a response for one kind of query parses cleanly as any other.
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    pub query: QueryBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryBody {
    pub categorymembers: Vec<CategoryMember>,
    pub pages: Vec<RawPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryMember {
    pub pageid: u64,
    pub ns: i64,
    pub title: String,
}

impl CategoryMember {
    pub const NS_MAIN: i64 = 0;
    pub const NS_CATEGORY: i64 = 14;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPage {
    /// Absent for missing pages and for files hosted on a shared repository.
    pub pageid: Option<u64>,
    pub ns: i64,
    pub title: String,
    pub missing: bool,
    pub coordinates: Vec<RawCoordinate>,
    pub pageimage: Option<String>,
    pub extract: Option<String>,
    pub fullurl: Option<String>,
    pub imageinfo: Vec<RawImageInfo>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawCoordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawImageInfo {
    pub url: String,
    /// Kept untyped: the API emits `[]` instead of `{}` when a file has no metadata.
    pub extmetadata: Value,
}

impl RawImageInfo {
    /// `extmetadata.<key>.value` as text, if present and non-empty.
    pub fn meta(&self, key: &str) -> Option<String> {
        let value = self.extmetadata.get(key)?.get("value")?;
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Parse a list of raw responses, preserving order.
pub fn parse_responses(responses: &[Value]) -> Result<Vec<QueryResponse>, serde_json::Error> {
    responses.iter().map(QueryResponse::deserialize).collect()
}
