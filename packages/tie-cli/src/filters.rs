//! Query filters shared by the `iocs` and `feed` commands.
//!
//! Filters are rendered as an escaped `&name=value` fragment that the
//! request descriptors append to the query string.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;

/// Date layouts accepted for `*_since` / `*_until` filters, tried in order.
const DATE_LAYOUTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATE_TIME_LAYOUTS: [&str; 3] = [
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%a %b %d %H:%M:%S %Y", // Mon Jan 2 15:04:05 2006
];

/// Layouts carrying a numeric offset.
const OFFSET_LAYOUTS: [&str; 2] = [
    "%a %b %d %H:%M:%S %z %Y", // Mon Jan 02 15:04:05 -0700 2006
    "%d %b %y %H:%M %z",       // 02 Jan 06 15:04 -0700
];

/// Layouts carrying a zone abbreviation, matched after the abbreviation is
/// removed. The abbreviation is read as UTC.
const ZONE_NAME_LAYOUTS: [&str; 4] = [
    "%a %b %d %H:%M:%S %Y",   // Mon Jan 2 15:04:05 MST 2006
    "%d %b %y %H:%M",         // 02 Jan 06 15:04 MST
    "%A, %d-%b-%y %H:%M:%S",  // Monday, 02-Jan-06 15:04:05 MST
    "%a, %d %b %Y %H:%M:%S",  // Mon, 02 Jan 2006 15:04:05 MST
];

/// Wire format of date filters
const OUTPUT_LAYOUT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Severity, a single value or a range such as 2-4
    #[arg(long)]
    pub severity: Option<String>,

    /// Confidence, a single value or a range such as 60-100
    #[arg(long)]
    pub confidence: Option<String>,

    /// Comma separated IOC categories
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Only IOCs updated since the given date
    #[arg(long)]
    pub updated_since: Option<String>,

    /// Only IOCs updated until the given date
    #[arg(long)]
    pub updated_until: Option<String>,

    /// Only IOCs created since the given date
    #[arg(long)]
    pub created_since: Option<String>,

    /// Only IOCs created until the given date
    #[arg(long)]
    pub created_until: Option<String>,

    /// Only IOCs first seen since the given date
    #[arg(long)]
    pub first_seen_since: Option<String>,

    /// Only IOCs first seen until the given date
    #[arg(long)]
    pub first_seen_until: Option<String>,

    /// Only IOCs last seen since the given date
    #[arg(long)]
    pub last_seen_since: Option<String>,

    /// Only IOCs last seen until the given date
    #[arg(long)]
    pub last_seen_until: Option<String>,
}

impl FilterArgs {
    /// Filters in wire order, paired with their query parameter names.
    fn pairs(&self) -> [(&'static str, Option<&str>); 11] {
        [
            ("severity", self.severity.as_deref()),
            ("confidence", self.confidence.as_deref()),
            ("category", self.category.as_deref()),
            ("updated_since", self.updated_since.as_deref()),
            ("updated_until", self.updated_until.as_deref()),
            ("created_since", self.created_since.as_deref()),
            ("created_until", self.created_until.as_deref()),
            ("first_seen_since", self.first_seen_since.as_deref()),
            ("first_seen_until", self.first_seen_until.as_deref()),
            ("last_seen_since", self.last_seen_since.as_deref()),
            ("last_seen_until", self.last_seen_until.as_deref()),
        ]
    }

    /// Render the set filters as `&name=value` pairs.
    ///
    /// Date filters are normalized to UTC; an unparseable date is an error.
    pub fn to_query(&self) -> Result<String> {
        let mut query = String::new();

        for (name, value) in self.pairs() {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                tracing::debug!(name, "Filter not set, skipped");
                continue;
            };

            let value = if name.ends_with("_since") || name.ends_with("_until") {
                parse_date(value)?.format(OUTPUT_LAYOUT).to_string()
            } else {
                value.to_string()
            };

            query.push('&');
            query.push_str(&urlencoding::encode(name));
            query.push('=');
            query.push_str(&urlencoding::encode(&value));
        }

        Ok(query)
    }
}

/// Parse a user supplied date.
///
/// Accepts `2006-01-02`, `2006-01-02 15:04`, `2006/01/02`,
/// `2006/01/02 15:04`, the ctime, Unix `date` and Ruby layouts, RFC 822,
/// RFC 850, RFC 2822 and RFC 3339. Dates without an offset are taken as UTC.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.split_whitespace().collect::<Vec<_>>().join(" ");

    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(&input, layout) {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc());
            }
        }
    }

    for layout in DATE_TIME_LAYOUTS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&input, layout) {
            return Ok(datetime.and_utc());
        }
    }

    if let Ok(datetime) =
        DateTime::parse_from_rfc2822(&input).or_else(|_| DateTime::parse_from_rfc3339(&input))
    {
        return Ok(datetime.with_timezone(&Utc));
    }

    for layout in OFFSET_LAYOUTS {
        if let Ok(datetime) = DateTime::parse_from_str(&input, layout) {
            return Ok(datetime.with_timezone(&Utc));
        }
    }

    if let Some(stripped) = strip_zone_name(&input) {
        for layout in ZONE_NAME_LAYOUTS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(&stripped, layout) {
                return Ok(datetime.and_utc());
            }
        }
    }

    Err(anyhow!("unrecognized date: {:?}", input))
}

/// Drop the first zone abbreviation token (`MST`, `CEST`, ...), if any.
fn strip_zone_name(input: &str) -> Option<String> {
    let tokens: Vec<&str> = input.split(' ').collect();
    let zone = tokens
        .iter()
        .position(|t| (2..=5).contains(&t.len()) && t.bytes().all(|b| b.is_ascii_uppercase()))?;

    let rest: Vec<&str> = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != zone)
        .map(|(_, t)| *t)
        .collect();
    Some(rest.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_layouts() {
        let cases = [
            ("2015-01-01", "2015-01-01T00:00:00Z"),
            ("2017-03-04 13:45", "2017-03-04T13:45:00Z"),
            ("2017/03/04", "2017-03-04T00:00:00Z"),
            ("2017/03/04 07:05", "2017-03-04T07:05:00Z"),
            ("Sat, 04 Mar 2017 13:45:10 +0000", "2017-03-04T13:45:10Z"),
            ("2017-03-04T13:45:10+02:00", "2017-03-04T11:45:10Z"),
        ];

        for (input, expected) in cases {
            let parsed = parse_date(input).unwrap();
            assert_eq!(parsed.format(OUTPUT_LAYOUT).to_string(), expected, "{}", input);
        }
    }

    #[test]
    fn test_parse_date_named_layouts() {
        let cases = [
            ("Mon Jan 2 15:04:05 2006", "2006-01-02T15:04:05Z"),
            ("Mon Jan  2 15:04:05 UTC 2006", "2006-01-02T15:04:05Z"),
            ("Mon Jan 02 15:04:05 -0700 2006", "2006-01-02T22:04:05Z"),
            ("02 Jan 06 15:04 UTC", "2006-01-02T15:04:00Z"),
            ("02 Jan 06 15:04 -0700", "2006-01-02T22:04:00Z"),
            ("Monday, 02-Jan-06 15:04:05 UTC", "2006-01-02T15:04:05Z"),
            ("Mon, 02 Jan 2006 15:04:05 UTC", "2006-01-02T15:04:05Z"),
            ("2006-01-02T15:04:05.999999999+01:00", "2006-01-02T14:04:05Z"),
        ];

        for (input, expected) in cases {
            let parsed = parse_date(input).unwrap();
            assert_eq!(parsed.format(OUTPUT_LAYOUT).to_string(), expected, "{}", input);
        }
    }

    #[test]
    fn test_strip_zone_name() {
        assert_eq!(
            strip_zone_name("Mon Jan 2 15:04:05 MST 2006").as_deref(),
            Some("Mon Jan 2 15:04:05 2006")
        );
        assert_eq!(strip_zone_name("Mon Jan 2 15:04:05 2006"), None);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("2017-13-45").is_err());
    }

    #[test]
    fn test_query_order_and_escaping() {
        let filters = FilterArgs {
            category: Some("c2,phishing".into()),
            severity: Some("2-4".into()),
            confidence: Some("80".into()),
            first_seen_since: Some("2015-01-01".into()),
            ..Default::default()
        };

        assert_eq!(
            filters.to_query().unwrap(),
            "&severity=2-4&confidence=80&category=c2%2Cphishing\
             &first_seen_since=2015-01-01T00%3A00%3A00Z"
        );
    }

    #[test]
    fn test_empty_filters_render_nothing() {
        let filters = FilterArgs {
            category: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filters.to_query().unwrap(), "");
    }

    #[test]
    fn test_bad_date_filter_is_error() {
        let filters = FilterArgs {
            last_seen_until: Some("not a date".into()),
            ..Default::default()
        };
        assert!(filters.to_query().is_err());
    }
}
