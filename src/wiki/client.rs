use crate::config::HttpConfig;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur while talking to the wiki or the image host.
///
/// Every variant is fatal to the current run: the client never retries.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {status} for {url}")]
    Status { status: u16, url: String },
    /// Response body exceeded the configured size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Body was not valid JSON
    #[error("Invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The API answered 200 with an `error` object
    #[error("API error {code}: {info}")]
    Api { code: String, info: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Thin wrapper over `reqwest::Client` that enforces the politeness contract:
/// one identifying `User-Agent`, no retries, a fixed pause after every response.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
    delay: Duration,
    max_response_bytes: usize,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout,
            delay: config.delay,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Same connection pool, different pause between calls.
    pub fn with_delay(&self, delay: Duration) -> Self {
        Self {
            delay,
            ..self.clone()
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// GET `base` with `params` appended as a query string and decode the body as JSON.
    ///
    /// A 200 response carrying a MediaWiki `error` object is reported as
    /// [`HttpError::Api`].
    pub async fn get_json(
        &self,
        base: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, HttpError> {
        let url = Url::parse_with_params(base, params)?;
        let bytes = self.get(url).await?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)?;

        if let Some(error) = json.get("error") {
            let field = |name: &str| {
                error
                    .get(name)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            return Err(HttpError::Api {
                code: field("code"),
                info: field("info"),
            });
        }

        Ok(json)
    }

    /// GET a binary resource (image file).
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let url = Url::parse(url)?;
        self.get(url).await
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, HttpError> {
        tracing::debug!(url = %url, "GET");

        let result = match tokio::time::timeout(self.timeout, self.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(HttpError::Timeout(self.timeout)),
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        result
    }

    async fn fetch(&self, url: Url) -> Result<Vec<u8>, HttpError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        read_limited_bytes(response, self.max_response_bytes).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, HttpError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(HttpError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(HttpError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> HttpClient {
        HttpClient::new(&HttpConfig {
            user_agent: "wiki-spots-test/0.0 (test@example.com)".to_string(),
            timeout: Duration::from_secs(5),
            delay: Duration::ZERO,
            max_response_bytes: 1024,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_json_sends_user_agent_and_params() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("action", "query"))
            .and(query_param("cmtitle", "Category:東京都の観光地"))
            .and(header("user-agent", "wiki-spots-test/0.0 (test@example.com)"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"batchcomplete":true}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let params = vec![
            ("action".to_string(), "query".to_string()),
            ("cmtitle".to_string(), "Category:東京都の観光地".to_string()),
        ];
        let json = test_client()
            .get_json(&format!("{}/w/api.php", mock_server.uri()), &params)
            .await
            .unwrap();

        assert_eq!(json["batchcomplete"], serde_json::Value::Bool(true));
    }

    #[tokio::test]
    async fn test_non_2xx_is_status_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1) // no retry
            .mount(&mock_server)
            .await;

        let result = test_client()
            .get_json(&format!("{}/w/api.php", mock_server.uri()), &[])
            .await;

        match result {
            Err(HttpError::Status { status: 503, .. }) => {}
            other => panic!("Expected Status(503), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_object_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"error":{"code":"badvalue","info":"Unrecognized value for parameter \"list\"."}}"#,
            ))
            .mount(&mock_server)
            .await;

        let result = test_client().get_json(&mock_server.uri(), &[]).await;

        match result {
            Err(HttpError::Api { code, .. }) => assert_eq!(code, "badvalue"),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let result = test_client().get_json(&mock_server.uri(), &[]).await;
        assert!(matches!(result, Err(HttpError::Decode(_))));
    }

    #[tokio::test]
    async fn test_get_bytes_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff]))
            .mount(&mock_server)
            .await;

        let bytes = test_client()
            .get_bytes(&format!("{}/img/a.jpg", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xff, 0xd8, 0xff]);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&mock_server)
            .await;

        let result = test_client().get_bytes(&mock_server.uri()).await;
        assert!(matches!(result, Err(HttpError::ResponseTooLarge(1024))));
    }

    #[test]
    fn test_with_delay_keeps_other_settings() {
        let client = test_client().with_delay(Duration::from_millis(5));
        assert_eq!(client.delay(), Duration::from_millis(5));
        assert_eq!(client.max_response_bytes, 1024);
    }
}
