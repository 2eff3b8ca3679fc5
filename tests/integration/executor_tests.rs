//! Integration tests for crawl execution
//!
//! These tests use wiremock to stand in for the cluster's control plane and
//! an in-memory sink to stand in for the Kafka broker.

use crawl_executor::cluster::{build_http_client, FeedStatus, HealthGate, RateLimitPublisher};
use crawl_executor::config::{parse_config, Config};
use crawl_executor::ids::SequentialIds;
use crawl_executor::plan::parse_plan;
use crawl_executor::producer::{MemorySink, MessageProducer, SinkError, SPIDER_ID};
use crawl_executor::source::UrlSource;
use crawl_executor::{Executor, RunOutcome};
use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the given control plane
fn create_test_config(rest_url: &str, progress_interval: u64) -> Config {
    parse_config(&format!(
        r#"
[cluster]
rest-url = "{}"
request-timeout-ms = 500
connect-timeout-ms = 200

[kafka]
brokers = "localhost:9092"
topic = "demo.incoming"
queue-full-timeout-ms = 1000

[producer]
progress-interval = {}
"#,
        rest_url, progress_interval
    ))
    .expect("Failed to build test config")
}

fn health_body(kafka: bool, redis: bool, node: &str) -> serde_json::Value {
    serde_json::json!({
        "kafka_connected": kafka,
        "redis_connected": redis,
        "node_health": node,
    })
}

async fn mount_health(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_feed(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Decoded bodies of every feed request the control plane received
async fn feed_requests(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/feed")
        .map(|r| serde_json::from_slice(&r.body).expect("feed body is JSON"))
        .collect()
}

fn url_source(csv: &str) -> UrlSource<&[u8]> {
    UrlSource::from_reader(csv.as_bytes(), "urls.csv").expect("valid URL dump")
}

fn health_gate(rest_url: &str) -> HealthGate {
    let config = create_test_config(rest_url, 100_000);
    let client = build_http_client(&config.cluster).unwrap();
    HealthGate::new(client, &config.cluster)
}

/// Log lines written while a future runs
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[tokio::test]
async fn test_health_gate_passes_healthy_cluster() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server, health_body(true, true, "GREEN")).await;

    assert!(health_gate(&mock_server.uri()).check().await);
}

#[tokio::test]
async fn test_health_gate_fails_on_any_unsatisfied_signal() {
    for body in [
        health_body(false, true, "GREEN"),
        health_body(true, false, "GREEN"),
        health_body(true, true, "YELLOW"),
        health_body(true, true, "RED"),
    ] {
        let mock_server = MockServer::start().await;
        mount_health(&mock_server, body.clone()).await;

        assert!(
            !health_gate(&mock_server.uri()).check().await,
            "expected unhealthy for {}",
            body
        );
    }
}

#[tokio::test]
async fn test_health_gate_fails_on_malformed_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    assert!(!health_gate(&mock_server.uri()).check().await);
}

#[tokio::test]
async fn test_health_gate_fails_on_error_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(health_body(true, true, "GREEN")))
        .mount(&mock_server)
        .await;

    assert!(!health_gate(&mock_server.uri()).check().await);
}

#[tokio::test]
async fn test_health_gate_fails_on_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(health_body(true, true, "GREEN"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    assert!(!health_gate(&mock_server.uri()).check().await);
}

#[tokio::test]
async fn test_health_gate_fails_when_unreachable() {
    // Nothing listens on the discard port.
    assert!(!health_gate("http://127.0.0.1:9").check().await);
}

#[tokio::test]
async fn test_rate_limit_request_for_single_domain() {
    let mock_server = MockServer::start().await;
    mount_feed(&mock_server, 200).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let publisher = RateLimitPublisher::new(
        build_http_client(&config.cluster).unwrap(),
        &config.cluster,
        Arc::new(SequentialIds::new("req")),
    );
    let plan = parse_plan("domains:\n  example.com:\n    window: 60\n    hits: 10\n").unwrap();

    let statuses = publisher.apply(&plan).await.unwrap();

    assert_eq!(statuses.into_iter().collect::<Vec<_>>(), vec![FeedStatus::Http(200)]);
    let requests = feed_requests(&mock_server).await;
    assert_eq!(
        requests,
        vec![serde_json::json!({
            "appid": "crawl_planner",
            "uuid": "req-1",
            "domain": "example.com",
            "action": "domain-update",
            "window": 60,
            "hits": 10,
        })]
    );
}

#[tokio::test]
async fn test_rate_limits_one_request_per_domain_with_unique_ids() {
    let mock_server = MockServer::start().await;
    mount_feed(&mock_server, 201).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let publisher = RateLimitPublisher::new(
        build_http_client(&config.cluster).unwrap(),
        &config.cluster,
        Arc::new(crawl_executor::ids::UuidGenerator),
    );
    let plan = parse_plan(
        r#"
domains:
  a.example: {window: 60, hits: 10}
  b.example: {window: 60, hits: 20}
  c.example: {window: 30, hits: 1}
  d.example: {window: 1, hits: 1}
"#,
    )
    .unwrap();

    publisher.apply(&plan).await.unwrap();

    let requests = feed_requests(&mock_server).await;
    assert_eq!(requests.len(), 4);

    let ids: HashSet<_> = requests.iter().map(|r| r["uuid"].to_string()).collect();
    assert_eq!(ids.len(), 4);

    let domains: HashSet<_> = requests
        .iter()
        .map(|r| r["domain"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(domains.len(), 4);
}

#[tokio::test]
async fn test_rate_limits_attempt_every_domain_before_rejecting() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/feed"))
        .and(wiremock::matchers::body_string_contains("b.example"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_feed(&mock_server, 200).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let publisher = RateLimitPublisher::new(
        build_http_client(&config.cluster).unwrap(),
        &config.cluster,
        Arc::new(SequentialIds::new("req")),
    );
    let plan = parse_plan(
        "domains:\n  a.example: {window: 60, hits: 10}\n  b.example: {window: 60, hits: 10}\n  c.example: {window: 60, hits: 10}\n",
    )
    .unwrap();

    let result = publisher.apply(&plan).await;

    assert!(matches!(
        result,
        Err(crawl_executor::cluster::ClusterError::RateLimitRejected { ref statuses })
            if statuses == &vec![FeedStatus::Http(500)]
    ));
    assert_eq!(feed_requests(&mock_server).await.len(), 3);
}

#[tokio::test]
async fn test_execute_schedules_every_url() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server, health_body(true, true, "GREEN")).await;
    mount_feed(&mock_server, 200).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let executor = Executor::new(config, Arc::new(SequentialIds::new("id"))).unwrap();
    let plan = parse_plan("domains:\n  example.com: {window: 60, hits: 10}\n").unwrap();
    let sink = MemorySink::recording();
    let handle = sink.clone();

    let outcome = executor
        .execute(
            &plan,
            url_source("url\nhttps://example.com/a\nhttps://example.com/b\nhttps://example.com/c\n"),
            move || Ok::<_, SinkError>(sink),
        )
        .await;

    let RunOutcome::Scheduled { crawl_id, summary } = &outcome else {
        panic!("expected a scheduled run, got {:?}", outcome);
    };
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.failed, 0);

    let messages = handle.messages();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| &m.crawlid == crawl_id));
    assert!(messages.iter().all(|m| m.spiderid == SPIDER_ID));
    assert!(messages.iter().all(|m| m.appid == "crawl_planner"));
    assert!(handle.is_closed());

    // The crawl id is drawn once, before any rate-limit request id.
    assert_eq!(crawl_id, "id-1");
    assert_eq!(feed_requests(&mock_server).await[0]["uuid"], "id-2");
}

#[tokio::test]
async fn test_execute_aborts_on_unhealthy_cluster() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server, health_body(false, true, "GREEN")).await;
    mount_feed(&mock_server, 200).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let executor = Executor::new(config, Arc::new(SequentialIds::new("id"))).unwrap();
    let plan = parse_plan("domains:\n  example.com: {window: 60, hits: 10}\n").unwrap();
    let opened = Arc::new(AtomicBool::new(false));
    let opened_flag = Arc::clone(&opened);

    let outcome = executor
        .execute(&plan, url_source("url\nhttps://example.com/a\n"), move || {
            opened_flag.store(true, Ordering::SeqCst);
            Ok::<_, SinkError>(MemorySink::recording())
        })
        .await;

    assert_eq!(outcome, RunOutcome::HealthAbort);
    assert_eq!(outcome.exit_code(), 1);
    assert!(!opened.load(Ordering::SeqCst));
    assert!(feed_requests(&mock_server).await.is_empty());
}

#[tokio::test]
async fn test_execute_aborts_on_rejected_rate_limit() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server, health_body(true, true, "GREEN")).await;
    mount_feed(&mock_server, 400).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let executor = Executor::new(config, Arc::new(SequentialIds::new("id"))).unwrap();
    let plan = parse_plan("domains:\n  example.com: {window: 60, hits: 10}\n").unwrap();
    let sink = MemorySink::recording();
    let handle = sink.clone();

    let outcome = executor
        .execute(&plan, url_source("url\nhttps://example.com/a\n"), move || {
            Ok::<_, SinkError>(sink)
        })
        .await;

    assert_eq!(
        outcome,
        RunOutcome::RateLimitAbort {
            statuses: vec![FeedStatus::Http(400)]
        }
    );
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(handle.submitted(), 0);
}

#[tokio::test]
async fn test_execute_reports_unavailable_sink() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server, health_body(true, true, "GREEN")).await;
    mount_feed(&mock_server, 200).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let executor = Executor::new(config, Arc::new(SequentialIds::new("id"))).unwrap();
    let plan = parse_plan("domains: {}").unwrap();

    let outcome = executor
        .execute(&plan, url_source("url\nhttps://example.com/a\n"), || {
            Err::<MemorySink, _>(SinkError::Connect("no brokers".to_string()))
        })
        .await;

    assert_eq!(outcome, RunOutcome::SinkUnavailable);
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_delivery_failures_do_not_change_exit_code() {
    let mock_server = MockServer::start().await;
    mount_health(&mock_server, health_body(true, true, "GREEN")).await;
    mount_feed(&mock_server, 200).await;

    let config = create_test_config(&mock_server.uri(), 100_000);
    let executor = Executor::new(config, Arc::new(SequentialIds::new("id"))).unwrap();
    let plan = parse_plan("domains: {}").unwrap();
    let sink = MemorySink::new().fail_when(|m| m.url.contains("/lost"));

    let outcome = executor
        .execute(
            &plan,
            url_source("url\nhttps://example.com/a\nhttps://example.com/lost\n"),
            move || Ok::<_, SinkError>(sink),
        )
        .await;

    let RunOutcome::Scheduled { summary, .. } = &outcome else {
        panic!("expected a scheduled run, got {:?}", outcome);
    };
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_progress_and_final_count_logs() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let config = create_test_config("http://localhost:5343", 2);
    let rows: String = (0..5)
        .map(|i| format!("https://example.com/{}\n", i))
        .collect();
    let csv = format!("url\n{}", rows);

    let summary = MessageProducer::from_config(MemorySink::new(), &config)
        .run(url_source(&csv), "crawl-1")
        .with_subscriber(subscriber)
        .await;

    assert_eq!(summary.sent, 5);

    let lines = logs.lines();
    let progress = lines.iter().filter(|l| l.contains("Still producing")).count();
    let final_counts = lines
        .iter()
        .filter(|l| l.contains("Delivery complete"))
        .count();
    assert_eq!(progress, 2);
    assert_eq!(final_counts, 1);
    assert!(lines
        .iter()
        .any(|l| l.contains("Delivery complete: 5 sent, 0 failed, 0 skipped")));
}
