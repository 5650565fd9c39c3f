use super::client::{HttpClient, HttpError};
use serde_json::Value;

/// Continuation key of category member listings.
pub const CONTINUE_KEY: &str = "cmcontinue";

/// Continuation keys of the `coordinates`, `extracts` and `pageimages` props.
///
/// Each prop pages its results on its own budget (`colimit`, `exlimit`,
/// `pilimit`), so a detail batch can need several requests even though the
/// page list itself fits in one.
pub const PAGE_CONTINUE_KEYS: [&str; 3] = ["cocontinue", "excontinue", "picontinue"];

/// Continuation key of the `imageinfo` prop.
pub const IMAGE_CONTINUE_KEY: &str = "iicontinue";

const CATEGORY_KEYS: &[&str] = &[CONTINUE_KEY];
const IMAGE_KEYS: &[&str] = &[IMAGE_CONTINUE_KEY];

/// Ordered `key=value` parameters for one `action=query` request, plus the
/// continuation keys that mean "this query has more results".
///
/// Setting a key that is already present replaces its value in place, which
/// is how continuation tokens from the previous response are merged in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    params: Vec<(String, String)>,
    continue_keys: &'static [&'static str],
}

impl QueryParams {
    /// `action=query&format=json&formatversion=2`
    pub fn query() -> Self {
        Self::default()
            .with("action", "query")
            .with("format", "json")
            .with("formatversion", "2")
    }

    /// Direct members (pages and subcategories) of one category.
    pub fn category_members(category: &str) -> Self {
        Self::query()
            .with("list", "categorymembers")
            .with("cmtitle", category)
            .with("cmtype", "page|subcat")
            .with("cmprop", "ids|title")
            .with("cmlimit", "max")
            .continued_by(CATEGORY_KEYS)
    }

    /// Coordinates, lead image, plain-text intro and canonical URL for a batch of pages.
    pub fn page_details(page_ids: &[u64]) -> Self {
        let ids = page_ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join("|");

        Self::query()
            .with("prop", "coordinates|pageimages|extracts|info")
            .with("pageids", &ids)
            .with("coprimary", "primary")
            .with("colimit", "max")
            .with("piprop", "name")
            .with("pilimit", "max")
            .with("exintro", "1")
            .with("explaintext", "1")
            .with("exlimit", "max")
            .with("inprop", "url")
            .continued_by(&PAGE_CONTINUE_KEYS)
    }

    /// Download URL and attribution metadata for a batch of files.
    ///
    /// `file_names` are bare names (`Tokyo Tower.jpg`); the `File:` namespace is added here.
    pub fn image_details<S: AsRef<str>>(file_names: &[S]) -> Self {
        let titles = file_names
            .iter()
            .map(|name| format!("File:{}", name.as_ref()))
            .collect::<Vec<_>>()
            .join("|");

        Self::query()
            .with("prop", "imageinfo")
            .with("titles", &titles)
            .with("iiprop", "url|extmetadata")
            .continued_by(IMAGE_KEYS)
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Keys whose presence in a response's `continue` object requests another round.
    pub fn continued_by(mut self, keys: &'static [&'static str]) -> Self {
        self.continue_keys = keys;
        self
    }

    pub fn continue_keys(&self) -> &'static [&'static str] {
        self.continue_keys
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.params.retain(|(k, _)| k != key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.params
    }
}

/// The parameters to merge into the next request, or `None` when the
/// response's `continue` object carries none of `keys` and the query is over.
///
/// Every member of the `continue` object is carried over, not just the
/// matching key, since the API expects its `continue` marker echoed back.
/// Numeric tokens (`excontinue`) are sent as their decimal text.
pub fn continuation(response: &Value, keys: &[&str]) -> Option<Vec<(String, String)>> {
    let cont = response.get("continue")?.as_object()?;
    if !keys.iter().any(|key| cont.contains_key(*key)) {
        return None;
    }

    Some(
        cont.iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k.clone(), s.clone())),
                Value::Number(n) => Some((k.clone(), n.to_string())),
                _ => None,
            })
            .collect(),
    )
}

/// MediaWiki API endpoint bound to a polite HTTP client.
#[derive(Debug, Clone)]
pub struct WikiApi {
    http: HttpClient,
    endpoint: String,
}

impl WikiApi {
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue `params` and follow continuation tokens until the server stops sending them.
    ///
    /// Returns every raw response in request order. Tokens from one response
    /// replace those of the previous one; a prop that finished is not asked
    /// for again. There is no page limit and no retry: the first failing
    /// request aborts the whole query.
    pub async fn query_all(&self, mut params: QueryParams) -> Result<Vec<Value>, HttpError> {
        let mut responses = Vec::new();
        let mut carried: Vec<String> = Vec::new();

        loop {
            let response = self.http.get_json(&self.endpoint, params.as_slice()).await?;
            let next = continuation(&response, params.continue_keys());
            responses.push(response);

            match next {
                Some(tokens) => {
                    for key in carried.drain(..) {
                        params.remove(&key);
                    }
                    for (key, value) in &tokens {
                        params.set(key, value);
                        carried.push(key.clone());
                    }
                    tracing::debug!(
                        tokens = ?tokens,
                        fetched = responses.len(),
                        "Following continuation"
                    );
                }
                None => return Ok(responses),
            }
        }
    }
}
