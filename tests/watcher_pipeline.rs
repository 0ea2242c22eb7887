//! End-to-end watcher runs against a mock of the Management Activity API.

mod support;

use std::sync::Arc;
use std::time::Duration;

use o365watch::api::parse_window_bound;
use o365watch::{
    ActivityApiClient, ApiClientOptions, ContentType, Credentials, Resource, SubscriptionWatcher,
    WatcherConfig,
};
use support::{audit_record, blob, MockApiServer, MockFeed};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn local_created(minutes_ago: i64) -> String {
    (chrono::Local::now() - chrono::Duration::minutes(minutes_ago))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

async fn start_server(feed: MockFeed) -> (MockApiServer, Arc<ActivityApiClient>) {
    let server = MockApiServer::start(feed)
        .await
        .expect("mock server should start");
    let options = ApiClientOptions {
        api_base: Some(server.feed_url()),
        token_url: Some(server.token_url()),
        ..ApiClientOptions::default()
    };
    let client = ActivityApiClient::with_options(
        Credentials {
            tenant_id: "tenant-1".to_owned(),
            client_id: "client-1".to_owned(),
            client_secret: "s3cret".to_owned(),
        },
        options,
    )
    .expect("client should build");
    (server, Arc::new(client))
}

async fn drain(mut out: tokio::sync::mpsc::Receiver<Resource>) {
    loop {
        match timeout(Duration::from_secs(5), out.recv()).await {
            Ok(None) => return,
            Ok(Some(_)) => continue,
            Err(_) => panic!("stream should close after cancellation"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cold_start_streams_records_with_look_behind_window() {
    let feed = MockFeed::new();
    feed.subscribe(&["Audit.Exchange"]);
    feed.set_content(
        "Audit.Exchange",
        vec![blob("C1", "Audit.Exchange", &local_created(30))],
    );
    feed.set_audits(
        "C1",
        vec![audit_record("r1", "Add-Mailbox"), audit_record("r2", "Set-Mailbox")],
    );

    let (server, client) = start_server(feed.clone()).await;
    let watcher = SubscriptionWatcher::new(client, WatcherConfig::new(60, 1).unwrap()).unwrap();
    let shutdown = CancellationToken::new();
    let mut out = watcher.run(shutdown.clone());

    let resource = timeout(Duration::from_secs(5), out.recv())
        .await
        .expect("a resource should arrive within a few ticks")
        .expect("stream should be open");

    assert_eq!(resource.request.map(|r| r.content_type), Some(ContentType::AuditExchange));
    assert_eq!(resource.records.len(), 2);
    assert!(resource.errors.is_empty());
    assert_eq!(
        resource.records[0].operation.as_deref(),
        Some("Add-Mailbox")
    );

    let queries = feed.content_queries();
    assert!(!queries.is_empty());
    let first = &queries[0];
    assert_eq!(first.content_type, "Audit.Exchange");
    assert_eq!(first.publisher, "client-1");
    let start = parse_window_bound(&first.start_time).unwrap();
    let end = parse_window_bound(&first.end_time).unwrap();
    assert_eq!(end - start, chrono::Duration::minutes(60));

    shutdown.cancel();
    drain(out).await;
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_windows_do_not_replay_processed_blobs() {
    let feed = MockFeed::new();
    feed.subscribe(&["Audit.Exchange"]);
    feed.set_content(
        "Audit.Exchange",
        vec![blob("C1", "Audit.Exchange", &local_created(30))],
    );
    feed.set_audits("C1", vec![audit_record("r1", "Add-Mailbox")]);

    let (server, client) = start_server(feed.clone()).await;
    let watcher = SubscriptionWatcher::new(client, WatcherConfig::new(60, 1).unwrap()).unwrap();
    let shutdown = CancellationToken::new();
    let mut out = watcher.run(shutdown.clone());

    let resource = timeout(Duration::from_secs(5), out.recv())
        .await
        .expect("the first tick should emit")
        .expect("stream should be open");
    assert_eq!(resource.records.len(), 1);

    // Let a few more ticks run; every one re-lists the same blob but the
    // creation watermark must keep it from being fetched again.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(feed.audit_queries().len(), 1);
    assert!(feed.content_queries().len() >= 2);
    assert!(
        timeout(Duration::from_millis(300), out.recv()).await.is_err(),
        "no further resource should be emitted for already-processed content"
    );

    shutdown.cancel();
    drain(out).await;
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn content_listing_failure_only_affects_its_content_type() {
    let feed = MockFeed::new();
    feed.subscribe(&["Audit.SharePoint", "Audit.Exchange"]);
    feed.fail_content("Audit.SharePoint", 503, "AF20051", "backend unavailable");
    feed.set_content(
        "Audit.Exchange",
        vec![blob("C1", "Audit.Exchange", &local_created(10))],
    );
    feed.set_audits("C1", vec![audit_record("r1", "Add-Mailbox")]);

    let (server, client) = start_server(feed.clone()).await;
    let watcher = SubscriptionWatcher::new(client, WatcherConfig::new(60, 1).unwrap()).unwrap();
    let shutdown = CancellationToken::new();
    let mut out = watcher.run(shutdown.clone());

    let mut sharepoint_errors = 0;
    let mut exchange_records = 0;
    while sharepoint_errors < 2 || exchange_records == 0 {
        let resource = timeout(Duration::from_secs(10), out.recv())
            .await
            .expect("resources should keep arriving")
            .expect("stream should be open");
        match resource.request.map(|r| r.content_type) {
            Some(ContentType::AuditSharePoint) => {
                assert!(resource.records.is_empty());
                assert_eq!(resource.errors.len(), 1);
                assert!(format!("{}", resource.errors[0]).contains("AF20051"));
                sharepoint_errors += 1;
            }
            Some(ContentType::AuditExchange) => {
                assert_eq!(resource.records.len(), 1);
                assert!(resource.errors.is_empty());
                exchange_records += 1;
            }
            other => panic!("unexpected resource for {other:?}"),
        }
    }

    // A failed listing never advances the request watermark, so every
    // SharePoint window keeps the full look-behind width instead of
    // narrowing to the gap since the last success.
    for query in feed
        .content_queries()
        .iter()
        .filter(|q| q.content_type == "Audit.SharePoint")
    {
        let start = parse_window_bound(&query.start_time).unwrap();
        let end = parse_window_bound(&query.end_time).unwrap();
        assert_eq!(end - start, chrono::Duration::minutes(60));
    }

    shutdown.cancel();
    drain(out).await;
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_closes_the_stream() {
    let feed = MockFeed::new();
    feed.subscribe(&["Audit.General"]);

    let (server, client) = start_server(feed).await;
    let watcher = SubscriptionWatcher::new(client, WatcherConfig::new(60, 1).unwrap()).unwrap();
    let shutdown = CancellationToken::new();
    let mut out = watcher.run(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    shutdown.cancel();

    loop {
        match timeout(Duration::from_secs(5), out.recv()).await {
            Ok(None) => break,
            Ok(Some(resource)) => {
                // Whatever was in flight must still be a well-formed resource.
                assert!(resource.request.is_some() || !resource.errors.is_empty());
            }
            Err(_) => panic!("stream should close promptly after cancellation"),
        }
    }

    server.shutdown().await;
}
