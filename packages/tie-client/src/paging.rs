//! Pagination driver.
//!
//! `PageCursor` walks the pages of one logical query:
//!
//! ```text
//! Fetching ──2xx + continuation──► Fetching
//!    │  │
//!    │  └──2xx, no continuation──► Done
//!    ├──>=500──► Retrying ──(attempts left)──► Fetching same URL
//!    │              └──(exhausted)──► Failed
//!    └──300-499 / transport / decode──► Failed
//! ```
//!
//! Two continuation styles exist and an endpoint family uses exactly one:
//! the `Link: <url>; rel="next"` header, whose URI is followed verbatim, or
//! the legacy `has_more` body flag, which advances the offset by the page
//! size and rebuilds the URL from the descriptor.

use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Result, TieError};
use crate::request::RequestDescriptor;
use crate::retry::Sleeper;
use crate::transport::{HttpResponse, Transport};
use crate::types::ApiMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Follow the `rel="next"` entry of the `Link` header.
    Link,
    /// Keep paging while the JSON body reports `has_more`.
    HasMore,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Fetching { url: String, offset: usize },
    Done,
    Failed,
}

#[derive(Deserialize)]
struct MoreFlag {
    #[serde(default)]
    has_more: bool,
}

/// Cursor over the pages of one query.
pub struct PageCursor<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    config: &'a ClientConfig,
    descriptor: &'a dyn RequestDescriptor,
    continuation: Continuation,
    state: State,
    paced: bool,
    fetches: usize,
}

impl<'a> PageCursor<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        sleeper: &'a dyn Sleeper,
        config: &'a ClientConfig,
        descriptor: &'a dyn RequestDescriptor,
        continuation: Continuation,
    ) -> Self {
        let url = match continuation {
            Continuation::Link => descriptor.build_url(config, None),
            Continuation::HasMore => descriptor.build_url(config, Some(0)),
        };

        Self {
            transport,
            sleeper,
            config,
            descriptor,
            continuation,
            state: State::Fetching { url, offset: 0 },
            paced: false,
            fetches: 0,
        }
    }

    /// HTTP attempts made so far, retries included.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Fetch the next page body.
    ///
    /// Returns `Ok(None)` once the query is complete. After an error the
    /// cursor is failed and also returns `Ok(None)` from then on.
    pub async fn next_page(&mut self) -> Result<Option<Bytes>> {
        let (url, offset) = match &self.state {
            State::Fetching { url, offset } => (url.clone(), *offset),
            State::Done | State::Failed => return Ok(None),
        };

        if !self.paced {
            self.paced = true;
            self.sleeper.sleep(self.config.retry.pacing).await;
        }

        match self.fetch(&url).await {
            Ok(response) => match self.advance(offset, &response) {
                Ok(state) => {
                    self.state = state;
                    Ok(Some(response.body))
                }
                Err(e) => {
                    self.state = State::Failed;
                    Err(e)
                }
            },
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// GET `url`, retrying server errors with exponential backoff.
    async fn fetch(&mut self, url: &str) -> Result<HttpResponse> {
        let policy = &self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.fetches += 1;
            debug!(url, attempt, "GET");

            let response = self
                .transport
                .get(url, self.descriptor.format().accept(), &self.config.auth_token)
                .await?;

            match classify(&response) {
                Ok(()) => return Ok(response),
                Err(TieError::Server { status, message }) if attempt < policy.max_attempts => {
                    let backoff = policy.backoff(attempt - 1);
                    warn!(status, %message, retry_in = ?backoff, "Server error, retrying");
                    self.sleeper.sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn advance(&self, offset: usize, response: &HttpResponse) -> Result<State> {
        match self.continuation {
            Continuation::Link => match response.link.as_deref().map(next_link).transpose()? {
                Some(Some(next)) => Ok(State::Fetching { url: next, offset }),
                _ => Ok(State::Done),
            },
            Continuation::HasMore => {
                let flag: MoreFlag = serde_json::from_slice(&response.body)?;
                if flag.has_more {
                    let offset = offset + self.config.page_limit;
                    debug!(offset, "Asking API for more IOCs");
                    Ok(State::Fetching {
                        url: self.descriptor.build_url(self.config, Some(offset)),
                        offset,
                    })
                } else {
                    Ok(State::Done)
                }
            }
        }
    }
}

/// Map a response status onto the error taxonomy.
pub(crate) fn classify(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }

    if response.status >= 500 {
        return Err(TieError::Server {
            status: response.status,
            message: response.body_text(),
        });
    }

    let is_json = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("application/json"));

    let message = if is_json {
        let msg: ApiMessage = serde_json::from_slice(&response.body)?;
        msg.describe()
    } else {
        response.body_text()
    };

    warn!(status = response.status, %message, "TIE returned an error");
    Err(TieError::Client {
        status: response.status,
        message,
    })
}

/// Extract the `rel="next"` target from a `Link` header value.
pub fn next_link(header: &str) -> Result<Option<String>> {
    for entry in split_entries(header) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let rest = entry
            .strip_prefix('<')
            .ok_or_else(|| TieError::Decode(format!("parse link: {}", entry)))?;
        let end = rest
            .find('>')
            .ok_or_else(|| TieError::Decode(format!("parse link: {}", entry)))?;
        let (uri, params) = (&rest[..end], &rest[end + 1..]);

        let is_next = params.split(';').any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next"))
        });

        if is_next {
            return Ok(Some(uri.to_string()));
        }
    }

    Ok(None)
}

// Commas inside `<...>` belong to the URI.
fn split_entries(header: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_uri = false;
    let mut start = 0;

    for (i, c) in header.char_indices() {
        match c {
            '<' => in_uri = true,
            '>' => in_uri = false,
            ',' if !in_uri => {
                entries.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&header[start..]);
    entries
}
