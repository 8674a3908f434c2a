//! Key-value HTTP client for the application under test
//!
//! One `Worker` speaks to one model's REST resource on the Rails app:
//! `POST /<model>s`, and `PUT`/`GET`/`DELETE /<model>s/<key>`. Error
//! statuses are returned to the caller, only transport failures are errors.

use std::time::{Duration, Instant};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use tracing::trace;

use crate::models::OpKind;
use crate::Result;

// Characters that cannot appear raw inside a single path segment. `.` is
// included so Rails does not read a key's tail as a format suffix.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'.')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Response to a single key-value request
#[derive(Debug, Clone)]
pub struct KvResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
    /// Time from sending the request to reading the whole body
    pub latency: Duration,
}

impl KvResponse {
    /// Whether the server answered with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client bound to one model resource
#[derive(Debug, Clone)]
pub struct Worker {
    client: Client,
    base_url: String,
    model: String,
}

impl Worker {
    /// Create a worker with its own connection pool
    pub fn new(base_url: &str, model: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client, base_url, model))
    }

    /// Create a worker sharing an existing client
    pub fn with_client(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Model label this worker targets
    pub fn model(&self) -> &str {
        &self.model
    }

    fn collection_url(&self) -> String {
        format!("{}/{}s", self.base_url, self.model)
    }

    fn member_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(),
            utf8_percent_encode(key, PATH_SEGMENT)
        )
    }

    /// Insert a new key-value pair
    pub async fn insert_kvp(&self, key: &str, value: &str) -> Result<KvResponse> {
        let req = self
            .client
            .post(self.collection_url())
            .json(&json!({ "key": key, "value": value }));
        self.send(req).await
    }

    /// Replace the value stored under `key`
    pub async fn update_kvp(&self, key: &str, value: &str) -> Result<KvResponse> {
        let req = self
            .client
            .put(self.member_url(key))
            .json(&json!({ "value": value }));
        self.send(req).await
    }

    /// Fetch the value stored under `key`
    pub async fn get_kvp(&self, key: &str) -> Result<KvResponse> {
        self.send(self.client.get(self.member_url(key))).await
    }

    /// Delete the pair stored under `key`
    pub async fn delete_kvp(&self, key: &str) -> Result<KvResponse> {
        self.send(self.client.delete(self.member_url(key))).await
    }

    /// Issue `op` for `key`; `value` is ignored by reads and deletes
    pub async fn execute(&self, op: OpKind, key: &str, value: &str) -> Result<KvResponse> {
        match op {
            OpKind::Insert => self.insert_kvp(key, value).await,
            OpKind::Update => self.update_kvp(key, value).await,
            OpKind::Get => self.get_kvp(key).await,
            OpKind::Delete => self.delete_kvp(key).await,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<KvResponse> {
        let start = Instant::now();
        let res = req.header(ACCEPT, "application/json").send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        let latency = start.elapsed();
        trace!(model = %self.model, status, latency_us = latency.as_micros() as u64, "kv request");
        Ok(KvResponse {
            status,
            body,
            latency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> Worker {
        Worker::with_client(Client::new(), "http://app.internal:3000/", "simple_key_value")
    }

    #[test]
    fn test_collection_url_pluralizes_model() {
        assert_eq!(
            worker().collection_url(),
            "http://app.internal:3000/simple_key_values"
        );
    }

    #[test]
    fn test_member_url_encodes_key() {
        let w = worker();
        assert_eq!(
            w.member_url("bench-1"),
            "http://app.internal:3000/simple_key_values/bench-1"
        );
        assert_eq!(
            w.member_url("a/b c"),
            "http://app.internal:3000/simple_key_values/a%2Fb%20c"
        );
        assert_eq!(
            w.member_url("run.json-3"),
            "http://app.internal:3000/simple_key_values/run%2Ejson-3"
        );
    }

    #[test]
    fn test_response_success_range() {
        let mut res = KvResponse {
            status: 201,
            body: String::new(),
            latency: Duration::ZERO,
        };
        assert!(res.is_success());
        res.status = 422;
        assert!(!res.is_success());
        res.status = 302;
        assert!(!res.is_success());
    }
}
