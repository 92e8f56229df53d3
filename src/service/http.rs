// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! HTTP composition service.

use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ComposeRequest, CompositionService, ServiceError, ServiceReply};

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

const COMPOSE_PATH: &str = "api/compose";

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for `POST <base>/api/compose`
#[derive(Debug, Clone)]
pub struct HttpCompositionService {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpCompositionService {
    /// Create a client; `None` uses [`DEFAULT_BASE_URL`]
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let base = base_url
            .map(Url::parse)
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL))
            .context("invalid composition service base URL")?;
        let endpoint = base
            .join(COMPOSE_PATH)
            .context("failed to build compose URL")?;
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, endpoint })
    }

    /// Compose endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl CompositionService for HttpCompositionService {
    async fn compose(&self, request: ComposeRequest) -> Result<ServiceReply, ServiceError> {
        debug!(mode = %request.mode, url = %self.endpoint, "sending compose request");
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::Service(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Service(format!("failed to read response: {e}")))?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("composition service rejected credentials");
            return Err(ServiceError::Unauthorized);
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("service responded with status {status}"));
            warn!(%status, %message, "compose request failed");
            return Err(ServiceError::Service(message));
        }

        ServiceReply::from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::PromptMode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one request with a canned response; yields the raw request
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}", addr), handle)
    }

    fn request() -> ComposeRequest {
        ComposeRequest::new("a music box lullaby", PromptMode::Compose)
    }

    #[test]
    fn test_endpoint() {
        let service = HttpCompositionService::new(Some("http://example.com")).unwrap();
        assert_eq!(service.endpoint().as_str(), "http://example.com/api/compose");
        assert!(HttpCompositionService::new(Some("not a url")).is_err());
    }

    #[tokio::test]
    async fn test_composition_reply() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"instrument":"music_box","notes":[{"pitch":"C5","duration":"4"}]}"#,
        )
        .await;
        let service = HttpCompositionService::new(Some(&base)).unwrap();
        let reply = service.compose(request()).await.unwrap();
        assert_eq!(reply.composition().map(|c| c.instrument.as_str()), Some("music_box"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/compose"));
        assert!(raw.contains(r#""prompt":"a music box lullaby""#));
        assert!(raw.contains(r#""mode":"compose""#));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let (base, _server) = serve_once("401 Unauthorized", r#"{"error":"expired"}"#).await;
        let service = HttpCompositionService::new(Some(&base)).unwrap();
        assert_eq!(service.compose(request()).await, Err(ServiceError::Unauthorized));
    }

    #[tokio::test]
    async fn test_error_field_is_reported() {
        let (base, _server) =
            serve_once("500 Internal Server Error", r#"{"error":"model overloaded"}"#).await;
        let service = HttpCompositionService::new(Some(&base)).unwrap();
        assert_eq!(
            service.compose(request()).await,
            Err(ServiceError::Service("model overloaded".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_body() {
        let (base, _server) = serve_once("200 OK", "").await;
        let service = HttpCompositionService::new(Some(&base)).unwrap();
        assert_eq!(service.compose(request()).await, Err(ServiceError::EmptyResponse));
    }
}
