//! HTTP transport seam.
//!
//! The page cursor and pingback only need two request shapes, so the HTTP
//! client sits behind a small trait. `ReqwestTransport` is the real
//! implementation; tests use `testing::ScriptedTransport`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header;
use tracing::warn;

use crate::error::{Result, TieError};

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Raw `Link` header
    pub link: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Attach a `Link` header.
    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET url` with `Accept` and bearer authorization.
    async fn get(&self, url: &str, accept: &str, token: &str) -> Result<HttpResponse>;

    /// `POST url` with a form-encoded body and bearer authorization.
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        token: &str,
    ) -> Result<HttpResponse>;
}

/// Transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers = response.headers();
        let content_type = header_string(headers, header::CONTENT_TYPE);
        let link = header_string(headers, header::LINK);

        let body = response.bytes().await.map_err(|e| {
            warn!(error = %e, "Failed to read response body");
            TieError::Transport(e.to_string())
        })?;

        Ok(HttpResponse {
            status,
            content_type,
            link,
            body,
        })
    }
}

fn header_string(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, accept: &str, token: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, accept)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url, "TIE request failed");
                TieError::Transport(e.to_string())
            })?;

        Self::read(response).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        token: &str,
    ) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url, "TIE pingback request failed");
                TieError::Transport(e.to_string())
            })?;

        Self::read(response).await
    }
}
