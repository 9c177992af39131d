#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build request for `{url}`: {source}")]
    InvalidRequest {
        url: String,
        #[source]
        source: hyper::http::Error,
    },
    #[error("request to `{url}` failed: {source}")]
    Request {
        url: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    #[error("request to `{url}` timed out")]
    Timeout { url: String },
    #[error("failed to read response body from `{url}`: {source}")]
    Body {
        url: String,
        #[source]
        source: hyper::Error,
    },
    #[error("`{url}` responded with status {status}: {body}")]
    Status {
        url: String,
        status: hyper::StatusCode,
        body: String,
    },
    #[error("failed to decode response from `{url}`: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
