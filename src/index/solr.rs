use super::traits::{IndexError, PingResponse, SearchIndex, UpdateResponse};
use crate::config::types::IndexConfig;
use crate::document::Document;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Longest response body carried into an error message
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct SolrResponse {
    #[serde(rename = "responseHeader")]
    header: ResponseHeader,
    #[serde(default)]
    error: Option<SolrErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseHeader {
    status: i64,
    #[serde(rename = "QTime", default)]
    qtime: u64,
}

#[derive(Debug, Deserialize)]
struct SolrErrorBody {
    #[serde(default)]
    msg: Option<String>,
}

/// HTTP client for a single Solr collection (or core)
#[derive(Debug)]
pub struct SolrIndex {
    collection_url: String,
    client: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
}

impl SolrIndex {
    pub fn new(config: &IndexConfig) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            collection_url: format!(
                "{}/{}",
                config.url.trim_end_matches('/'),
                config.collection.trim_matches('/')
            ),
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.collection_url, path);
        let builder = self.client.request(method, url).query(&[("wt", "json")]);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Interpret the reply to an update request.
///
/// A Solr body with a non-zero status is the index refusing the documents and is
/// returned as a response. Server errors (5xx) and failures without a Solr body
/// are service failures.
fn interpret_update(status: StatusCode, body: &str) -> Result<UpdateResponse, IndexError> {
    if status.is_server_error() {
        return Err(IndexError::Http {
            status: status.as_u16(),
            message: truncate(body),
        });
    }

    match serde_json::from_str::<SolrResponse>(body) {
        Ok(parsed) => {
            if let Some(msg) = parsed.error.and_then(|e| e.msg) {
                debug!(status = parsed.header.status, error = %msg, "Solr rejected update");
            }
            Ok(UpdateResponse {
                status: parsed.header.status,
                qtime: parsed.header.qtime,
            })
        }
        Err(_) if !status.is_success() => Err(IndexError::Http {
            status: status.as_u16(),
            message: truncate(body),
        }),
        Err(e) => Err(IndexError::Unexpected(format!(
            "could not decode update response: {}",
            e
        ))),
    }
}

/// Interpret the reply to a ping, returning the reported QTime
fn interpret_ping(status: StatusCode, body: &str) -> Result<u64, IndexError> {
    if !status.is_success() {
        return Err(IndexError::Http {
            status: status.as_u16(),
            message: truncate(body),
        });
    }

    let parsed: SolrResponse = serde_json::from_str(body)?;
    if parsed.header.status != 0 {
        return Err(IndexError::Http {
            status: status.as_u16(),
            message: format!("ping reported status {}", parsed.header.status),
        });
    }

    Ok(parsed.header.qtime)
}

#[async_trait]
impl SearchIndex for SolrIndex {
    async fn ping(&self) -> Result<PingResponse, IndexError> {
        let started = Instant::now();
        let response = self.request(Method::GET, "/admin/ping").send().await?;
        let status = response.status();
        let body = response.text().await?;
        let latency = started.elapsed();

        let qtime = interpret_ping(status, &body)?;
        Ok(PingResponse { qtime, latency })
    }

    async fn add(
        &self,
        documents: &[Document],
        commit_within: Duration,
    ) -> Result<UpdateResponse, IndexError> {
        let commit_within_ms = commit_within.as_millis().to_string();
        let response = self
            .request(Method::POST, "/update")
            .query(&[("commitWithin", commit_within_ms.as_str())])
            .json(documents)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        interpret_update(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, collection: &str) -> IndexConfig {
        IndexConfig {
            url: url.to_string(),
            collection: collection.to_string(),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_collection_url_normalized() {
        let index = SolrIndex::new(&config("http://localhost:8983/solr/", "/events/")).unwrap();
        assert_eq!(index.collection_url(), "http://localhost:8983/solr/events");
    }

    #[test]
    fn test_update_ok() {
        let body = r#"{"responseHeader":{"status":0,"QTime":12}}"#;
        let response = interpret_update(StatusCode::OK, body).unwrap();
        assert!(response.is_ok());
        assert_eq!(response.qtime, 12);
    }

    #[test]
    fn test_update_rejected_by_solr() {
        let body = r#"{"responseHeader":{"status":400,"QTime":3},
            "error":{"msg":"missing required field: id","code":400}}"#;
        let response = interpret_update(StatusCode::BAD_REQUEST, body).unwrap();
        assert_eq!(response.status, 400);
        assert!(!response.is_ok());
    }

    #[test]
    fn test_update_server_error_is_transport() {
        let body = r#"{"responseHeader":{"status":503,"QTime":0}}"#;
        let err = interpret_update(StatusCode::SERVICE_UNAVAILABLE, body).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_update_garbage_body() {
        let err = interpret_update(StatusCode::OK, "<html>proxy</html>").unwrap_err();
        assert!(matches!(err, IndexError::Unexpected(_)));

        let err = interpret_update(StatusCode::NOT_FOUND, "<html>not found</html>").unwrap_err();
        assert!(matches!(err, IndexError::Http { status: 404, .. }));
    }

    #[test]
    fn test_ping_requires_zero_status() {
        let ok = r#"{"responseHeader":{"status":0,"QTime":1},"status":"OK"}"#;
        assert_eq!(interpret_ping(StatusCode::OK, ok).unwrap(), 1);

        let bad = r#"{"responseHeader":{"status":500,"QTime":1}}"#;
        assert!(interpret_ping(StatusCode::OK, bad).is_err());
        assert!(interpret_ping(StatusCode::UNAUTHORIZED, "").is_err());
    }

    #[test]
    fn test_truncate_long_body() {
        let long = "x".repeat(MAX_ERROR_BODY * 2);
        let truncated = truncate(&long);
        assert_eq!(truncated.len(), MAX_ERROR_BODY + 3);
        assert!(truncated.ends_with("..."));
    }
}
