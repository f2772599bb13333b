// src/transport/mod.rs — Outbound calls to the REST and AI services
//
// Every endpoint is either buffered (the whole body parsed as JSON) or
// streamed (raw byte chunks handed to the frame parser). Only the
// tutoring `chat-stream` endpoint is streamed. No retries happen here.

pub mod http;

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use std::pin::Pin;

use crate::infra::errors::TutorError;

pub use http::HttpTransport;

/// Which remote service an endpoint lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Rest,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Buffered,
    Stream,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub service: Service,
    pub method: Method,
    /// Path relative to the service base, without a leading slash.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub mode: ResponseMode,
}

impl ApiRequest {
    pub fn get(service: Service, path: impl Into<String>) -> Self {
        Self {
            service,
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            mode: ResponseMode::Buffered,
        }
    }

    pub fn post(service: Service, path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            service,
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            mode: ResponseMode::Buffered,
        }
    }

    /// A POST whose response is consumed incrementally.
    pub fn stream(service: Service, path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            mode: ResponseMode::Stream,
            ..Self::post(service, path, body)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Short label used in errors and logs, e.g. `rest:lessons/start`.
    pub fn endpoint(&self) -> String {
        let svc = match self.service {
            Service::Rest => "rest",
            Service::Ai => "ai",
        };
        format!("{svc}:{}", self.path)
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TutorError>> + Send>>;

pub enum Reply {
    Json(serde_json::Value),
    Stream(ByteStream),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Reply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl Reply {
    pub fn into_json(self, endpoint: &str) -> Result<serde_json::Value, TutorError> {
        match self {
            Reply::Json(v) => Ok(v),
            Reply::Stream(_) => Err(TutorError::schema(endpoint, "expected JSON, got a stream")),
        }
    }

    pub fn into_stream(self, endpoint: &str) -> Result<ByteStream, TutorError> {
        match self {
            Reply::Stream(s) => Ok(s),
            Reply::Json(_) => Err(TutorError::schema(endpoint, "expected a stream, got JSON")),
        }
    }
}

/// Seam between the clients and the network. Tests script this.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Reply, TutorError>;
}

/// Send a buffered request and decode the reply into `T`.
pub async fn send_json<T: serde::de::DeserializeOwned>(
    transport: &dyn Transport,
    request: ApiRequest,
) -> Result<T, TutorError> {
    let endpoint = request.endpoint();
    tracing::debug!(endpoint = %endpoint, "request");
    let value = transport.send(request).await?.into_json(&endpoint)?;
    serde_json::from_value(value).map_err(|e| TutorError::schema(&endpoint, e))
}

pub async fn send_stream(
    transport: &dyn Transport,
    request: ApiRequest,
) -> Result<ByteStream, TutorError> {
    let endpoint = request.endpoint();
    tracing::debug!(endpoint = %endpoint, "stream request");
    transport.send(request).await?.into_stream(&endpoint)
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<serde_json::Value>,
    debug: Option<serde_json::Value>,
    trace: Option<String>,
}

/// Build a `TutorError::Status` from a non-2xx body. Services answer with
/// `{error, debug}` or `{detail}`; anything else is kept verbatim.
pub(crate) fn status_error(endpoint: &str, status: u16, body: &str) -> TutorError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let (message, debug) = match parsed {
        Some(b) => {
            let message = b
                .error
                .or_else(|| b.detail.map(|d| value_text(&d)))
                .unwrap_or_else(|| body.trim().to_string());
            let debug = b.debug.map(|d| value_text(&d)).or(b.trace);
            (message, debug)
        }
        None => (body.trim().to_string(), None),
    };
    TutorError::Status {
        endpoint: endpoint.to_string(),
        status,
        message,
        debug,
    }
}

fn value_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
