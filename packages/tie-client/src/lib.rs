//! Client for the TIE threat intelligence IOC API.
//!
//! Queries are paginated on the server. The client walks every page of a
//! query, retries server errors with bounded backoff, and either folds the
//! pages into one output document (`csv`, `json` or a locally built `bloom`
//! filter) or streams the decoded IOCs one by one.
//!
//! # Example
//!
//! ```rust,ignore
//! use tie_client::{ClientConfig, Format, IocRequest, TieClient};
//!
//! let client = TieClient::new(ClientConfig::new("your-api-token"))?;
//!
//! // Render all matches as CSV on stdout
//! let request = IocRequest::new("google", "domainname", Format::Csv);
//! client.write(&request, &mut std::io::stdout()).await?;
//!
//! // Or consume them as a stream
//! let mut stream = client.stream(IocRequest::new("google", "domainname", Format::Json));
//! while let Some(ioc) = stream.recv().await {
//!     println!("{}", ioc?.value);
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod format;
pub mod paging;
pub mod request;
pub mod retry;
pub mod stream;
pub mod testing;
pub mod transport;
pub mod types;

pub use aggregator::{AggregatorKind, AggregatorOptions, PageAggregator};
pub use config::ClientConfig;
pub use error::{Result, TieError};
pub use format::{resolve, Format};
pub use paging::{Continuation, PageCursor};
pub use request::{FeedRequest, IocRequest, RequestDescriptor};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use stream::IocStream;
pub use transport::{HttpResponse, ReqwestTransport, Transport};
pub use types::{Ioc, IocPage, IocParams, PingbackReceipt};

use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

pub struct TieClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl TieClient {
    /// Create a client that talks HTTP through `reqwest` and sleeps on the
    /// tokio timer.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create from environment variables. See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            transport,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the sleeper used for pacing and retry backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Aggregated output
    // =========================================================================

    /// Fetch every page of `request` and write one document in the request's
    /// format to `out`.
    ///
    /// Returns the number of pages fetched. Nothing is written unless every
    /// page was fetched successfully.
    pub async fn write<W: Write + Send>(
        &self,
        request: &dyn RequestDescriptor,
        out: &mut W,
    ) -> Result<usize> {
        let mut aggregator = request.format().aggregator(&self.config.aggregator);
        self.write_with(request, aggregator.as_mut(), out).await
    }

    /// Like [`write`](Self::write), with a caller-owned aggregator.
    ///
    /// The aggregator is reset first, so one instance can serve several
    /// queries in turn.
    pub async fn write_with(
        &self,
        request: &dyn RequestDescriptor,
        aggregator: &mut dyn PageAggregator,
        out: &mut (dyn Write + Send),
    ) -> Result<usize> {
        aggregator.reset();

        let mut cursor = PageCursor::new(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            &self.config,
            request,
            Continuation::Link,
        );

        let mut pages = 0;
        while let Some(body) = cursor.next_page().await? {
            aggregator.add_page(&body)?;
            pages += 1;
        }

        aggregator.finish(&mut *out)?;
        out.flush()?;

        info!(
            format = %request.format(),
            pages,
            fetches = cursor.fetches(),
            "Query complete"
        );
        Ok(pages)
    }

    /// Convenience for [`write`](Self::write) with an [`IocRequest`].
    pub async fn get_iocs<W: Write + Send>(
        &self,
        query: &str,
        data_type: &str,
        extra_args: &str,
        format: Format,
        out: &mut W,
    ) -> Result<usize> {
        let request = IocRequest::new(query, data_type, format).extra_args(extra_args);
        self.write(&request, out).await
    }

    /// Convenience for [`write`](Self::write) with a [`FeedRequest`].
    pub async fn get_feed<W: Write + Send>(
        &self,
        period: &str,
        data_type: &str,
        extra_args: &str,
        format: Format,
        out: &mut W,
    ) -> Result<usize> {
        let request = FeedRequest::new(period, data_type, format).extra_args(extra_args);
        self.write(&request, out).await
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Stream the IOCs of `request` as they are decoded.
    ///
    /// Pages are fetched as JSON by a spawned task, whatever format the
    /// request names. Must be called within a tokio runtime.
    pub fn stream<R>(&self, request: R) -> IocStream
    where
        R: RequestDescriptor + 'static,
    {
        let (tx, ioc_stream) = IocStream::channel();
        let config = Arc::clone(&self.config);
        let transport = Arc::clone(&self.transport);
        let sleeper = Arc::clone(&self.sleeper);

        tokio::spawn(async move {
            let request = JsonPages(request);
            let cursor = PageCursor::new(
                transport.as_ref(),
                sleeper.as_ref(),
                &config,
                &request,
                Continuation::HasMore,
            );
            stream::produce(cursor, tx).await;
        });

        ioc_stream
    }

    /// Stream `request` and drain it into one page.
    ///
    /// Fails with the first error; IOCs received before it are discarded.
    pub async fn collect<R>(&self, request: R) -> Result<IocPage>
    where
        R: RequestDescriptor + 'static,
    {
        self.stream(request).collect_page().await
    }

    // =========================================================================
    // Pingback
    // =========================================================================

    /// Report that `value` was observed now.
    pub async fn pingback(&self, data_type: &str, value: &str) -> Result<PingbackReceipt> {
        self.pingback_at(data_type, value, Utc::now()).await
    }

    /// Report that `value` was observed at `seen`. Not retried.
    pub async fn pingback_at(
        &self,
        data_type: &str,
        value: &str,
        seen: DateTime<Utc>,
    ) -> Result<PingbackReceipt> {
        let token = self
            .config
            .pingback_token
            .as_deref()
            .ok_or_else(|| TieError::Config("pingback token not configured".into()))?;

        let url = format!("{}submit", self.config.pingback_url);
        let form = [
            ("data_type", data_type.to_string()),
            ("value", value.to_string()),
            ("seen", seen.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ];

        debug!(url = %url, data_type, value, "POST pingback");
        let response = self.transport.post_form(&url, &form, token).await?;
        paging::classify(&response)?;

        Ok(PingbackReceipt {
            status: response.status,
            body: response.body_text(),
        })
    }
}

/// Forces JSON pages whatever format the wrapped request names; the stream
/// decodes every page body.
struct JsonPages<R>(R);

impl<R: RequestDescriptor> RequestDescriptor for JsonPages<R> {
    fn build_url(&self, config: &ClientConfig, offset: Option<usize>) -> String {
        self.0.build_url(config, offset)
    }

    fn format(&self) -> Format {
        Format::Json
    }
}
