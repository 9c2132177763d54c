//! Integration tests for streamed consumption.
//!
//! `TieClient::stream` pages with the `has_more` flag and hands decoded IOCs
//! over a channel that always closes, whether the query succeeds or fails.

mod common;

use std::time::Duration;

use futures::StreamExt;
use tie_client::testing::ScriptedTransport;
use tie_client::{FeedRequest, Format, IocPage, IocRequest, IocStream, TieError};

use crate::common::{json_page, server_error, test_client, test_config, API_URL};

#[tokio::test]
async fn test_stream_yields_iocs_in_order() {
    let transport = ScriptedTransport::new()
        .with(json_page(&["a", "b"], 0, 2, true))
        .with(json_page(&["c"], 2, 2, false));
    let (client, _) = test_client(test_config(2), &transport);

    let mut stream = client.stream(IocRequest::new("google", "domainname", Format::Json));

    let mut values = Vec::new();
    while let Some(item) = stream.recv().await {
        values.push(item.unwrap().value);
    }

    assert_eq!(values, ["a", "b", "c"]);

    let urls = transport.urls();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("&offset=0"));
    assert!(urls[1].ends_with("&offset=2"));
}

#[tokio::test]
async fn test_stream_requests_json_whatever_the_format() {
    let transport = ScriptedTransport::new().with(json_page(&["a"], 0, 2, false));
    let (client, _) = test_client(test_config(2), &transport);

    let items: Vec<_> = client
        .stream(FeedRequest::new("daily", "DomainName", Format::Csv))
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    let calls = transport.calls();
    assert_eq!(calls[0].accept, "application/json");
    assert_eq!(
        calls[0].url,
        format!(
            "{}iocs/feed/daily?data_type=domainname&limit=2&date_format=rfc3339&offset=0",
            API_URL
        )
    );
}

#[tokio::test]
async fn test_collect_matches_merged_scenario() {
    let transport = ScriptedTransport::new()
        .with(json_page(&["a.google.example", "b.google.example"], 0, 2, true))
        .with(json_page(&["c.google.example"], 2, 2, false));
    let (client, _) = test_client(test_config(2), &transport);

    let page = client
        .collect(IocRequest::new("google", "domainname", Format::Json))
        .await
        .unwrap();

    assert_eq!(page.iocs.len(), 3);
    assert_eq!(page.params.limit, 3);
    assert_eq!(page.params.offset, 0);
    assert!(!page.has_more);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_stream_closes_after_error() {
    let transport = ScriptedTransport::new()
        .with(json_page(&["a", "b"], 0, 2, true))
        .with(ScriptedTransport::text_response(400, "text/plain", "bad offset"));
    let (client, _) = test_client(test_config(2), &transport);

    let mut stream = client.stream(IocRequest::new("google", "domainname", Format::Json));

    assert_eq!(stream.recv().await.unwrap().unwrap().value, "a");
    assert_eq!(stream.recv().await.unwrap().unwrap().value, "b");
    match stream.recv().await {
        Some(Err(TieError::Client { status, message })) => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad offset");
        }
        other => panic!("expected client error, got {:?}", other.map(|r| r.is_ok())),
    }
    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn test_stream_closes_when_first_request_fails() {
    let transport =
        ScriptedTransport::new().with_error(TieError::Transport("connection refused".into()));
    let (client, _) = test_client(test_config(2), &transport);

    let items: Vec<_> = client
        .stream(IocRequest::new("google", "domainname", Format::Json))
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(TieError::Transport(_))));
}

#[tokio::test]
async fn test_collect_discards_partial_results() {
    let transport = ScriptedTransport::new()
        .with(json_page(&["a", "b"], 0, 2, true))
        .with(server_error())
        .with(server_error())
        .with(server_error());
    let (client, sleeper) = test_client(test_config(2), &transport);

    let err = client
        .collect(IocRequest::new("google", "domainname", Format::Json))
        .await
        .unwrap_err();

    assert!(matches!(err, TieError::Server { status: 500, .. }));
    assert_eq!(transport.calls().len(), 4);
    assert_eq!(
        sleeper.sleeps(),
        vec![
            Duration::from_millis(100),
            Duration::from_secs(5),
            Duration::from_secs(10)
        ]
    );
}

#[tokio::test]
async fn test_undecodable_page_ends_stream() {
    let transport = ScriptedTransport::new().with(ScriptedTransport::text_response(
        200,
        "application/json",
        "{not json",
    ));
    let (client, _) = test_client(test_config(2), &transport);

    let items: Vec<_> = client
        .stream(IocRequest::new("google", "domainname", Format::Json))
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(TieError::Decode(_))));
}

#[tokio::test]
async fn test_dropped_consumer_stops_producer() {
    let many: Vec<String> = (0..200).map(|i| format!("v{}", i)).collect();
    let refs: Vec<&str> = many.iter().map(String::as_str).collect();
    let transport = ScriptedTransport::new()
        .with(json_page(&refs, 0, 200, true))
        .with(json_page(&["never"], 200, 200, false));
    let (client, _) = test_client(test_config(200), &transport);

    let mut stream = client.stream(IocRequest::new("v", "domainname", Format::Json));
    assert!(stream.recv().await.unwrap().is_ok());
    drop(stream);

    // Give the producer a chance to observe the closed channel
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_saved_json_output_replays_as_stream() {
    let transport = ScriptedTransport::new().with(json_page(&["a", "b", "c"], 0, 3, false));
    let (client, _) = test_client(test_config(3), &transport);

    let mut saved: Vec<u8> = Vec::new();
    client
        .write(&IocRequest::new("google", "domainname", Format::Json), &mut saved)
        .await
        .unwrap();

    let replayed: IocPage = IocStream::from_json_reader(&saved[..])
        .unwrap()
        .collect_page()
        .await
        .unwrap();

    let values: Vec<_> = replayed.iocs.iter().map(|i| i.value.as_str()).collect();
    assert_eq!(values, ["a", "b", "c"]);
}
