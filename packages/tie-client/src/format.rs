//! Output format registry.
//!
//! Maps the user-facing format names to media types and aggregators. This is
//! the only place where a format is turned into behaviour.

use std::fmt;
use std::str::FromStr;

use crate::aggregator::{
    AggregatorOptions, BloomPageAggregator, JsonPageAggregator, PageAggregator,
    RawPageAggregator, StixPageAggregator,
};
use crate::error::{Result, TieError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bloom,
    Csv,
    Json,
    Stix,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Bloom, Format::Csv, Format::Json, Format::Stix];

    pub fn name(self) -> &'static str {
        match self {
            Format::Bloom => "bloom",
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Stix => "stix",
        }
    }

    /// Media type of the rendered output.
    pub fn media_type(self) -> &'static str {
        match self {
            Format::Bloom => "application/bloom",
            Format::Csv => "text/csv",
            Format::Json => "application/json",
            Format::Stix => "text/xml",
        }
    }

    /// `Accept` header for page requests.
    ///
    /// Bloom filters are built locally from JSON pages, so that format asks
    /// the server for JSON.
    pub fn accept(self) -> &'static str {
        match self {
            Format::Bloom => Format::Json.media_type(),
            other => other.media_type(),
        }
    }

    /// Fresh, empty aggregator for this format.
    pub fn aggregator(self, options: &AggregatorOptions) -> Box<dyn PageAggregator> {
        match self {
            Format::Bloom => Box::new(BloomPageAggregator::new(options.bloom_fp_rate)),
            Format::Csv => Box::new(RawPageAggregator::new()),
            Format::Json => Box::new(JsonPageAggregator::new()),
            Format::Stix => Box::new(StixPageAggregator),
        }
    }
}

impl FromStr for Format {
    type Err = TieError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bloom" => Ok(Format::Bloom),
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "stix" => Ok(Format::Stix),
            other => Err(TieError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a format name to its media type and a fresh aggregator.
pub fn resolve(
    name: &str,
    options: &AggregatorOptions,
) -> Result<(&'static str, Box<dyn PageAggregator>)> {
    let format: Format = name.parse()?;
    Ok((format.media_type(), format.aggregator(options)))
}
