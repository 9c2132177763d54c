//! TIE API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Decode an explicit `null` as the field's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Indicators
// =============================================================================

/// A single indicator of compromise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ioc {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,

    /// Observed value (domain name, address, hash, ...)
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,

    /// Data type tag, e.g. "DomainName" or "IPv4"
    #[serde(deserialize_with = "null_as_default")]
    pub data_type: String,

    #[serde(deserialize_with = "null_as_default")]
    pub entity_ids: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub event_ids: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub event_attributes: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub source_pseudonyms: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub source_names: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub n_occurrences: i64,

    #[serde(deserialize_with = "null_as_default")]
    pub min_severity: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_severity: i64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub min_confidence: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_confidence: i64,

    #[serde(deserialize_with = "null_as_default")]
    pub enrich: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_requested_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched_at: Option<DateTime<Utc>>,

    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub observation_attributes: Vec<String>,
}

// =============================================================================
// Query parameters
// =============================================================================

/// Parameters accepted by the search endpoint.
///
/// Responses echo the parameters that were applied, so this type is decoded
/// as often as it is encoded. `severity` and `confidence` hold either a
/// single value or a range string such as `"2-4"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IocParams {
    #[serde(deserialize_with = "null_as_default")]
    pub no_defaults: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub direction: String,
    #[serde(deserialize_with = "null_as_default")]
    pub order_by: String,
    #[serde(deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(deserialize_with = "null_as_default")]
    pub confidence: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ivalue: String,
    #[serde(deserialize_with = "null_as_default")]
    pub group_by: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub limit: usize,
    #[serde(deserialize_with = "null_as_default")]
    pub offset: usize,
    #[serde(deserialize_with = "null_as_default")]
    pub with_compositions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_since: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub date_field: String,
    #[serde(deserialize_with = "null_as_default")]
    pub enriched: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub date_format: String,
}

// =============================================================================
// Responses
// =============================================================================

/// One decoded page of a paginated IOC query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IocPage {
    #[serde(deserialize_with = "null_as_default")]
    pub has_more: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub iocs: Vec<Ioc>,
    #[serde(deserialize_with = "null_as_default")]
    pub params: IocParams,
}

/// Error envelope returned by the API for failed requests.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMessage {
    pub message: String,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl ApiMessage {
    pub(crate) fn describe(&self) -> String {
        match &self.errors {
            Some(errors) if !errors.is_null() => format!("{} {}", self.message, errors),
            _ => self.message.clone(),
        }
    }
}

/// Outcome of a pingback submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PingbackReceipt {
    pub status: u16,
    pub body: String,
}
