//! End-to-end tests for the agent loop with scripted collaborators

use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use temp_telemetry_agent::{
    Agent, AgentConfig, ConsoleDisplay, DeviceAddr, LinkSupervisor, MessagingClient, NetworkLink,
    Publisher, SensorBus, SensorReader, SessionState, StepOutcome,
};

const ADDR: DeviceAddr = 0x28;

/// Scripted sensor bus: one entry per read, `None` means an empty bus
#[derive(Clone)]
struct ScriptedBus {
    reads: Arc<Mutex<VecDeque<Option<f64>>>>,
}

impl ScriptedBus {
    fn new(script: Vec<Option<f64>>) -> Self {
        Self {
            reads: Arc::new(Mutex::new(script.into_iter().collect())),
        }
    }
}

impl SensorBus for ScriptedBus {
    async fn scan(&mut self) -> Result<Vec<DeviceAddr>> {
        let mut reads = self.reads.lock().unwrap();
        match reads.front() {
            Some(None) => {
                reads.pop_front();
                Ok(vec![])
            }
            Some(Some(_)) => Ok(vec![ADDR]),
            None => Ok(vec![]),
        }
    }

    async fn start_conversion(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read(&mut self, _addr: DeviceAddr) -> Result<f64> {
        match self.reads.lock().unwrap().pop_front() {
            Some(Some(value)) => Ok(value),
            _ => bail!("script exhausted"),
        }
    }
}

/// Link whose connectivity is externally controllable
#[derive(Clone)]
struct TestLink {
    up: Arc<AtomicBool>,
}

impl TestLink {
    fn new() -> Self {
        Self {
            up: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl NetworkLink for TestLink {
    async fn activate(&mut self) {}

    async fn begin_connect(&mut self, _ssid: &str, _credential: &str) {
        self.up.store(true, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

/// Messaging client that records publishes and can fail on demand
#[derive(Clone)]
struct RecordingClient {
    published: Arc<Mutex<Vec<(String, String)>>>,
    connects: Arc<AtomicUsize>,
    failing_publishes: Arc<AtomicUsize>,
}

impl RecordingClient {
    fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
            failing_publishes: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fail_next_publishes(&self, n: usize) {
        self.failing_publishes.store(n, Ordering::SeqCst);
    }

    fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

impl MessagingClient for RecordingClient {
    async fn connect(&mut self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        if self.failing_publishes.load(Ordering::SeqCst) > 0 {
            self.failing_publishes.fetch_sub(1, Ordering::SeqCst);
            bail!("transport error");
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

fn test_config() -> AgentConfig {
    AgentConfig {
        data_topic: "t/data".to_string(),
        error_topic: "t/err".to_string(),
        smoothing_alpha: 0.9,
        ..Default::default()
    }
}

fn build_agent(
    cfg: &AgentConfig,
    script: Vec<Option<f64>>,
    link: TestLink,
    client: RecordingClient,
) -> Agent<ScriptedBus, TestLink, RecordingClient, ConsoleDisplay> {
    let sensor = SensorReader::with_conversion_delay(ScriptedBus::new(script), Duration::ZERO);
    let supervisor =
        LinkSupervisor::with_poll_interval(link, "testnet", "secret", Duration::from_millis(1));
    let publisher = Publisher::with_backoff(client, Duration::from_millis(1));
    Agent::new(cfg, sensor, supervisor, publisher, None::<ConsoleDisplay>)
}

#[tokio::test]
async fn test_boot_without_sensor_is_fatal() {
    // Given: an empty bus at boot
    let cfg = test_config();
    let mut agent = build_agent(&cfg, vec![None], TestLink::new(), RecordingClient::new());

    // Then: bootstrap fails, nothing was published
    assert!(agent.bootstrap().await.is_err());
}

#[tokio::test]
async fn test_absent_sensor_publishes_diagnostics_and_preserves_filter() {
    // Given: a probe read, then three absent iterations, then a sample
    let cfg = test_config();
    let client = RecordingClient::new();
    let script = vec![Some(20.0), None, None, None, Some(20.0)];
    let mut agent = build_agent(&cfg, script, TestLink::new(), client.clone());

    agent.bootstrap().await.unwrap();

    // When: three absent iterations
    for _ in 0..3 {
        assert_eq!(agent.step().await, StepOutcome::SensorAbsent);
    }

    // Then: exactly 3 error-topic publishes, filter never seeded
    let published = client.published();
    assert_eq!(published.len(), 3);
    for (topic, payload) in &published {
        assert_eq!(topic, "t/err");
        assert_eq!(payload, "sensor error");
    }
    assert_eq!(agent.smoothed_value(), None);

    // And: the next sample seeds the filter exactly (untouched by the absences)
    assert_eq!(agent.step().await, StepOutcome::Published { smoothed: 20.0 });
    assert_eq!(client.published().last().unwrap().1, "20.00");
}

#[tokio::test]
async fn test_smoothing_sequence_published_rounded() {
    // Given: probe 25.0 (discarded), then samples 20.0, 22.0, 20.0 with alpha 0.9
    let cfg = test_config();
    let client = RecordingClient::new();
    let script = vec![Some(25.0), Some(20.0), Some(22.0), Some(20.0)];
    let mut agent = build_agent(&cfg, script, TestLink::new(), client.clone());

    agent.bootstrap().await.unwrap();

    let expected = [20.0, 20.2, 20.18];
    for want in expected {
        match agent.step().await {
            StepOutcome::Published { smoothed } => assert!((smoothed - want).abs() < 1e-9),
            other => panic!("expected publish of {}, got {:?}", want, other),
        }
    }

    // Then: primary-topic payloads are the rounded ASCII decimals
    let payloads: Vec<String> = client.published().into_iter().map(|(_, p)| p).collect();
    assert_eq!(payloads, vec!["20.00", "20.20", "20.18"]);
}

#[tokio::test]
async fn test_publish_failure_drops_reading_and_recovers_session() {
    // Given: a transport that fails exactly one publish
    let cfg = test_config();
    let client = RecordingClient::new();
    let script = vec![Some(20.0), Some(20.0), Some(21.0)];
    let mut agent = build_agent(&cfg, script, TestLink::new(), client.clone());

    agent.bootstrap().await.unwrap();
    assert_eq!(client.connects.load(Ordering::SeqCst), 1);
    client.fail_next_publishes(1);

    // When: the first steady-state publish fails
    match agent.step().await {
        StepOutcome::PublishFailed { smoothed } => assert!((smoothed - 20.0).abs() < 1e-9),
        other => panic!("expected publish failure, got {:?}", other),
    }

    // Then: session went Bound -> Unbound -> Bound (one reconnect), payload dropped
    assert_eq!(agent.session_state(), SessionState::Bound);
    assert_eq!(client.connects.load(Ordering::SeqCst), 2);
    assert!(client.published().is_empty());

    // And: the next scheduled reading is the next value on the primary topic
    match agent.step().await {
        StepOutcome::Published { smoothed } => assert!((smoothed - 20.1).abs() < 1e-9),
        other => panic!("expected publish, got {:?}", other),
    }
    assert_eq!(client.published(), vec![("t/data".to_string(), "20.10".to_string())]);
}

#[tokio::test]
async fn test_link_down_drops_reading_without_publish() {
    // Given: a healthy boot, then the link goes down between iterations
    let cfg = test_config();
    let client = RecordingClient::new();
    let link = TestLink::new();
    let script = vec![Some(20.0), Some(20.0)];
    let mut agent = build_agent(&cfg, script, link.clone(), client.clone());

    agent.bootstrap().await.unwrap();
    link.up.store(false, Ordering::SeqCst);

    // When: the next iteration runs (link check not yet due, default 10s)
    match agent.step().await {
        StepOutcome::Dropped { smoothed } => assert!((smoothed - 20.0).abs() < 1e-9),
        other => panic!("expected dropped reading, got {:?}", other),
    }

    // Then: the reading still updated the filter but nothing was published
    assert_eq!(agent.smoothed_value(), Some(20.0));
    assert!(client.published().is_empty());
}

#[tokio::test]
async fn test_due_link_check_heals_before_publishing() {
    // Given: a zero link-check interval so every iteration performs the check
    let mut cfg = test_config();
    cfg.link_check_interval_secs = 0;
    let client = RecordingClient::new();
    let link = TestLink::new();
    let script = vec![Some(20.0), Some(20.0)];
    let mut agent = build_agent(&cfg, script, link.clone(), client.clone());

    agent.bootstrap().await.unwrap();
    link.up.store(false, Ordering::SeqCst);

    // When: the next iteration runs with the link down
    let outcome = agent.step().await;

    // Then: the supervisor healed the link and the reading was published
    assert_eq!(outcome, StepOutcome::Published { smoothed: 20.0 });
    assert!(link.is_connected());
    assert_eq!(client.published().len(), 1);
}
