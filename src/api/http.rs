use anyhow::Result;
use std::collections::HashMap;

/// HTTP method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
}

/// Response data decoupled from any particular HTTP library
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    status_code: u16,
    /// Response body
    body: String,
}

impl HttpResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status_code: status,
            body: body.into(),
        }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status_code
    }

    /// Get a reference to the response body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Check if successful (2xx status)
    pub fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// Trait for HTTP operations, allowing for mocking
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform an HTTP GET request
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> Result<HttpResponse>;

    /// Perform an HTTP POST request
    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<HttpResponse>;
}

/// Implementation of HttpClient using reqwest
pub struct ReqwestHttpClient {
    /// Internal reqwest client
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new client wrapping a pre-configured reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse::new(status, body))
    }

    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url).body(body);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse::new(status, body))
    }
}
