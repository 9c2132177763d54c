//! Page aggregators.
//!
//! An aggregator folds the bodies of successive pages into one output
//! document. Each output format has its own variant; `Format::aggregator`
//! is the only place that picks one.
//!
//! The `bloom` format builds its filter on the client: pages are fetched as
//! JSON, every IOC value is collected, and `finish` sizes a single filter to
//! the total count at the configured false positive rate. Page bodies are
//! never filters themselves.

use std::io::Write;

use bloom_filter::BloomFilter;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TieError};
use crate::types::{Ioc, IocPage, IocParams};

pub const DEFAULT_BLOOM_FP_RATE: f64 = 0.01;

/// Settings shared by all aggregators built for a client.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorOptions {
    /// Target false positive rate of `bloom` output
    pub bloom_fp_rate: f64,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            bloom_fp_rate: DEFAULT_BLOOM_FP_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregatorKind {
    Raw,
    Json,
    Bloom,
    Stix,
}

/// Folds page bodies into a single output document.
pub trait PageAggregator: Send {
    /// Accumulate one page body.
    fn add_page(&mut self, body: &[u8]) -> Result<()>;

    /// Write the accumulated document to `out`.
    fn finish(&mut self, out: &mut dyn Write) -> Result<()>;

    /// Return to the empty state so the instance can serve another query.
    fn reset(&mut self);

    fn kind(&self) -> AggregatorKind;
}

// =============================================================================
// Raw passthrough
// =============================================================================

/// Concatenates page bodies verbatim. Used for CSV.
#[derive(Debug, Default)]
pub struct RawPageAggregator {
    buf: Vec<u8>,
}

impl RawPageAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageAggregator for RawPageAggregator {
    fn add_page(&mut self, body: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(body);
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        out.write_all(&self.buf)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.buf.clear();
    }

    fn kind(&self) -> AggregatorKind {
        AggregatorKind::Raw
    }
}

// =============================================================================
// JSON merge
// =============================================================================

/// Merges JSON pages into a single `{params, iocs}` document.
///
/// The last page's params win; on finish the offset is reset to zero and the
/// limit rewritten to the number of merged IOCs.
#[derive(Debug, Default)]
pub struct JsonPageAggregator {
    iocs: Vec<Ioc>,
    params: IocParams,
}

#[derive(Serialize)]
struct MergedDocument<'a> {
    params: IocParams,
    iocs: &'a [Ioc],
}

impl JsonPageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iocs(&self) -> &[Ioc] {
        &self.iocs
    }
}

impl PageAggregator for JsonPageAggregator {
    fn add_page(&mut self, body: &[u8]) -> Result<()> {
        let page: IocPage = serde_json::from_slice(body)?;
        self.iocs.extend(page.iocs);
        self.params = page.params;
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        let document = MergedDocument {
            params: IocParams {
                offset: 0,
                limit: self.iocs.len(),
                ..self.params.clone()
            },
            iocs: &self.iocs,
        };

        serde_json::to_writer(&mut *out, &document).map_err(|e| {
            if e.is_io() {
                TieError::Io(e.into())
            } else {
                TieError::Decode(e.to_string())
            }
        })?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn reset(&mut self) {
        self.iocs.clear();
        self.params = IocParams::default();
    }

    fn kind(&self) -> AggregatorKind {
        AggregatorKind::Json
    }
}

// =============================================================================
// Bloom filter builder
// =============================================================================

/// Collects IOC values from JSON pages and builds one filter on finish.
#[derive(Debug)]
pub struct BloomPageAggregator {
    fp_rate: f64,
    values: Vec<String>,
}

impl BloomPageAggregator {
    pub fn new(fp_rate: f64) -> Self {
        Self {
            fp_rate,
            values: Vec::new(),
        }
    }

    /// Build the filter for everything collected so far.
    pub fn build(&self) -> Result<BloomFilter> {
        let mut filter = BloomFilter::initialize(self.values.len(), self.fp_rate)?;
        for value in &self.values {
            filter.add(value.as_bytes());
        }
        Ok(filter)
    }
}

impl PageAggregator for BloomPageAggregator {
    fn add_page(&mut self, body: &[u8]) -> Result<()> {
        let page: IocPage = serde_json::from_slice(body)?;
        self.values.extend(page.iocs.into_iter().map(|ioc| ioc.value));
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.values.is_empty() {
            debug!(fp_rate = self.fp_rate, "Writing empty bloom filter");
        }
        self.build()?.write(&mut *out)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.values.clear();
    }

    fn kind(&self) -> AggregatorKind {
        AggregatorKind::Bloom
    }
}

// =============================================================================
// STIX
// =============================================================================

/// Placeholder for the structured threat exchange format.
///
/// The format name is accepted, but every operation fails instead of passing
/// unconverted data through.
#[derive(Debug, Default)]
pub struct StixPageAggregator;

impl PageAggregator for StixPageAggregator {
    fn add_page(&mut self, _body: &[u8]) -> Result<()> {
        Err(TieError::Unimplemented("stix"))
    }

    fn finish(&mut self, _out: &mut dyn Write) -> Result<()> {
        Err(TieError::Unimplemented("stix"))
    }

    fn reset(&mut self) {}

    fn kind(&self) -> AggregatorKind {
        AggregatorKind::Stix
    }
}
