// Common test utilities
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tie_client::testing::{RecordingSleeper, ScriptedTransport};
use tie_client::{ClientConfig, HttpResponse, TieClient};

pub const API_URL: &str = "https://api.example/v1/";

/// Config pointing at a fake endpoint with a small page size
pub fn test_config(page_limit: usize) -> ClientConfig {
    ClientConfig::new("secret-token")
        .with_api_url(API_URL)
        .with_pingback_url("https://pingback.example/api/v1")
        .with_page_limit(page_limit)
}

/// Build a client over a scripted transport and a recording sleeper
pub fn test_client(config: ClientConfig, transport: &ScriptedTransport) -> (TieClient, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let client = TieClient::with_transport(config, Arc::new(transport.clone()))
        .expect("valid test config")
        .with_sleeper(Arc::new(sleeper.clone()));
    (client, sleeper)
}

pub fn ioc(value: &str) -> Value {
    json!({
        "id": format!("id-{}", value),
        "value": value,
        "data_type": "DomainName",
        "categories": ["c2"],
        "max_severity": 3,
        "first_seen": "2017-03-01T10:00:00Z"
    })
}

/// JSON result page as the API returns it
pub fn json_page(values: &[&str], offset: usize, limit: usize, has_more: bool) -> HttpResponse {
    let iocs: Vec<Value> = values.iter().map(|v| ioc(v)).collect();
    ScriptedTransport::json_response(
        200,
        json!({
            "has_more": has_more,
            "iocs": iocs,
            "params": {
                "ivalue": "google",
                "limit": limit,
                "offset": offset,
                "date_format": "rfc3339"
            }
        }),
    )
}

pub fn next_link(offset: usize) -> String {
    format!(
        "<{}iocs?data_type=domainname&ivalue=google&limit=2&offset={}>; rel=\"next\"",
        API_URL, offset
    )
}

pub fn server_error() -> HttpResponse {
    ScriptedTransport::text_response(500, "text/plain", "upstream unavailable")
}
