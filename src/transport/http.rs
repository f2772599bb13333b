// src/transport/http.rs — reqwest-backed transport

use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use url::Url;

use super::{status_error, ApiRequest, Method, Reply, ResponseMode, Service, Transport};
use crate::infra::config::Config;
use crate::infra::errors::TutorError;

pub struct HttpTransport {
    client: reqwest::Client,
    api_base: Url,
    ai_base: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(api_base: Url, ai_base: Url, timeout: Duration, connect_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("tutorlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });
        Self {
            client,
            api_base,
            ai_base,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, TutorError> {
        Ok(Self::new(
            config.api_base_url()?,
            config.ai_base_url()?,
            Duration::from_secs(config.service.timeout_secs),
            Duration::from_secs(config.service.connect_timeout_secs),
        ))
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, TutorError> {
        let base = match request.service {
            Service::Rest => &self.api_base,
            Service::Ai => &self.ai_base,
        };
        let mut url = base
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TutorError::Config(format!("bad endpoint {}: {e}", request.path)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Reply, TutorError> {
        let endpoint = request.endpoint();
        let url = self.url_for(&request)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if request.mode == ResponseMode::Buffered {
            builder = builder.timeout(self.timeout);
        }

        let response = builder.send().await.map_err(|e| TutorError::Transport {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %endpoint, status = status.as_u16(), "request failed");
            return Err(status_error(&endpoint, status.as_u16(), &body));
        }

        match request.mode {
            ResponseMode::Buffered => {
                let text = response.text().await.map_err(|e| TutorError::Transport {
                    endpoint: endpoint.clone(),
                    message: e.to_string(),
                })?;
                let value = if text.trim().is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::from_str(&text).map_err(|e| TutorError::schema(&endpoint, e))?
                };
                Ok(Reply::Json(value))
            }
            ResponseMode::Stream => {
                let stream = response.bytes_stream().map(move |chunk| {
                    chunk
                        .map(|b| b.to_vec())
                        .map_err(|e| TutorError::Transport {
                            endpoint: endpoint.clone(),
                            message: format!("stream read error: {e}"),
                        })
                });
                Ok(Reply::Stream(Box::pin(stream)))
            }
        }
    }
}
