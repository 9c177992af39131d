use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;

use super::{ContainerInfo, Error, MachineInfo, Result, TelemetryProvider};

type HyperClient = Client<HttpConnector, Full<Bytes>>;

const API_PREFIX: &str = "/api/v1.3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for cAdvisor's v1.3 REST API.
#[derive(Clone)]
pub struct CAdvisorClient {
    client: HyperClient,
    base_url: String,
    timeout: Duration,
}

impl CAdvisorClient {
    /// Creates a client for the cAdvisor instance at `base_url`, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client,
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: hyper::Method,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<T> {
        let url = format!("{}{}{}", self.base_url, API_PREFIX, endpoint);
        let mut builder = hyper::Request::builder().method(method).uri(url.as_str());
        if body.is_some() {
            builder = builder.header(hyper::header::CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(body.map(Bytes::from).unwrap_or_default()))
            .map_err(|source| Error::InvalidRequest {
                url: url.clone(),
                source,
            })?;

        let (status, body) = tokio::time::timeout(self.timeout, self.send(req, &url))
            .await
            .map_err(|_| Error::Timeout { url: url.clone() })??;

        if !status.is_success() {
            return Err(Error::Status {
                url,
                status,
                body: String::from_utf8_lossy(&body).trim().to_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|source| Error::Decode { url, source })
    }

    /// Sends `req` and reads the whole response body.
    async fn send(
        &self,
        req: hyper::Request<Full<Bytes>>,
        url: &str,
    ) -> Result<(hyper::StatusCode, Bytes)> {
        let res = self
            .client
            .request(req)
            .await
            .map_err(|source| Error::Request {
                url: url.to_owned(),
                source,
            })?;
        let status = res.status();
        let body = res
            .into_body()
            .collect()
            .await
            .map_err(|source| Error::Body {
                url: url.to_owned(),
                source,
            })?
            .to_bytes();
        Ok((status, body))
    }
}

impl TelemetryProvider for CAdvisorClient {
    async fn machine_info(&self) -> Result<MachineInfo> {
        self.request(hyper::Method::GET, "/machine", None).await
    }

    async fn container_info(&self, path: &str, sample_count: u32) -> Result<ContainerInfo> {
        let endpoint = format!("/containers{path}");
        let body = serde_json::json!({ "num_stats": sample_count }).to_string();
        self.request(hyper::Method::POST, &endpoint, Some(body))
            .await
    }
}
