//! Request descriptors.
//!
//! A descriptor knows which endpoint a logical query targets and how to turn
//! it into a URL. It never performs I/O; the page cursor owns the offset or
//! continuation state.

use crate::config::ClientConfig;
use crate::format::Format;

/// Describes a logical query against the API.
pub trait RequestDescriptor: Send + Sync {
    /// URL for the page at `offset`, or the first page when `None`.
    fn build_url(&self, config: &ClientConfig, offset: Option<usize>) -> String;

    /// Output format the query is rendered in.
    fn format(&self) -> Format;
}

/// Free-text IOC search.
#[derive(Debug, Clone, PartialEq)]
pub struct IocRequest {
    /// Case insensitive value match
    pub query: String,
    pub data_type: String,
    /// Pre-escaped query string fragment, each pair prefixed with `&`
    pub extra_args: String,
    pub format: Format,
}

impl IocRequest {
    pub fn new(query: impl Into<String>, data_type: impl Into<String>, format: Format) -> Self {
        Self {
            query: query.into(),
            data_type: data_type.into(),
            extra_args: String::new(),
            format,
        }
    }

    pub fn extra_args(mut self, args: impl Into<String>) -> Self {
        self.extra_args = args.into();
        self
    }
}

impl RequestDescriptor for IocRequest {
    fn build_url(&self, config: &ClientConfig, offset: Option<usize>) -> String {
        let mut url = format!(
            "{}iocs?data_type={}&ivalue={}&limit={}&date_format=rfc3339{}",
            config.api_url,
            self.data_type.to_lowercase(),
            self.query,
            config.page_limit,
            self.extra_args
        );
        push_offset(&mut url, offset);
        url
    }

    fn format(&self) -> Format {
        self.format
    }
}

/// Periodic feed export, e.g. `hourly`, `daily`, `weekly` or `monthly`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRequest {
    pub period: String,
    pub data_type: String,
    pub extra_args: String,
    pub format: Format,
}

impl FeedRequest {
    pub fn new(period: impl Into<String>, data_type: impl Into<String>, format: Format) -> Self {
        Self {
            period: period.into(),
            data_type: data_type.into(),
            extra_args: String::new(),
            format,
        }
    }

    pub fn extra_args(mut self, args: impl Into<String>) -> Self {
        self.extra_args = args.into();
        self
    }
}

impl RequestDescriptor for FeedRequest {
    fn build_url(&self, config: &ClientConfig, offset: Option<usize>) -> String {
        let mut url = format!(
            "{}iocs/feed/{}?data_type={}&limit={}&date_format=rfc3339{}",
            config.api_url,
            self.period,
            self.data_type.to_lowercase(),
            config.page_limit,
            self.extra_args
        );
        push_offset(&mut url, offset);
        url
    }

    fn format(&self) -> Format {
        self.format
    }
}

fn push_offset(url: &mut String, offset: Option<usize>) {
    if let Some(offset) = offset {
        url.push_str("&offset=");
        url.push_str(&offset.to_string());
    }
}
