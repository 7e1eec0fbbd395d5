//! Integration tests for the connection driver
//!
//! A scripted in-memory transport stands in for the Socket.IO server so the
//! reconnect loop can be exercised deterministically.

use async_trait::async_trait;
use livechat_core::{
    ChatMessage, ChatSession, ClientEvent, DisplayLimit, FeedUpdate, ServerEvent, SessionConfig,
    SessionEvent,
};
use livechat_runtime::{
    Backoff, ConnectInfo, ConnectionDriver, LiveChat, Result, RuntimeError, Transport,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

// ----------------------------------------------------------------------------
// Mock Transport
// ----------------------------------------------------------------------------

/// What one accepted connection delivers
struct Script {
    events: VecDeque<ServerEvent>,
    /// Close after the events instead of staying open
    then_drop: bool,
}

#[derive(Default)]
struct MockState {
    scripts: VecDeque<Script>,
    current: Option<Script>,
    connects: usize,
    sent: Vec<ClientEvent>,
    closes: usize,
}

#[derive(Clone, Default)]
struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    fn with_scripts(scripts: Vec<Script>) -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().scripts = scripts.into();
        transport
    }

    fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    fn syncs_sent(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|event| **event == ClientEvent::Sync)
            .count()
    }

    fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<ConnectInfo> {
        let mut state = self.state.lock().unwrap();
        match state.scripts.pop_front() {
            Some(script) => {
                state.connects += 1;
                state.current = Some(script);
                Ok(ConnectInfo {
                    session_id: Some(format!("mock-{}", state.connects)),
                })
            }
            None => Err(RuntimeError::handshake("no more scripted connections")),
        }
    }

    async fn recv(&mut self) -> Result<Option<ServerEvent>> {
        let next = {
            let mut state = self.state.lock().unwrap();
            let Some(script) = state.current.as_mut() else {
                return Err(RuntimeError::Closed);
            };
            match script.events.pop_front() {
                Some(event) => Some(Some(event)),
                None if script.then_drop => {
                    state.current = None;
                    Some(None)
                }
                None => None,
            }
        };

        match next {
            Some(event) => Ok(event),
            // Connection stays open with nothing more to say
            None => std::future::pending().await,
        }
    }

    async fn send(&mut self, event: ClientEvent) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.current.is_none() {
            return Err(RuntimeError::Closed);
        }
        state.sent.push(event);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.current = None;
        state.closes += 1;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn message(id: &str, millis: i64) -> ChatMessage {
    ChatMessage::system(id, millis, format!("message {}", id))
}

fn dropping(events: Vec<ServerEvent>) -> Script {
    Script {
        events: events.into(),
        then_drop: true,
    }
}

fn holding(events: Vec<ServerEvent>) -> Script {
    Script {
        events: events.into(),
        then_drop: false,
    }
}

fn fast_backoff() -> Backoff {
    Backoff::new(Duration::from_millis(5), Duration::from_millis(20))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn ids(messages: &[ChatMessage]) -> Vec<String> {
    messages.iter().map(|m| m.id().to_string()).collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_sync_sent_once_per_connection() {
    let transport = MockTransport::with_scripts(vec![
        dropping(vec![ServerEvent::StreamMessages(vec![
            message("a", 1),
            message("b", 2),
        ])]),
        dropping(vec![]),
        holding(vec![ServerEvent::StreamMessage(message("c", 3))]),
    ]);
    let session = Arc::new(ChatSession::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = ConnectionDriver::new(
        transport.clone(),
        Arc::clone(&session),
        fast_backoff(),
        shutdown_rx,
    );
    let task = tokio::spawn(driver.run());

    wait_until(|| session.snapshot().messages.len() == 3).await;
    assert_eq!(transport.connects(), 3);
    assert_eq!(transport.syncs_sent(), 3);
    assert!(session.is_connected());
    assert_eq!(
        ids(&session.view(DisplayLimit::All)),
        vec!["a", "b", "c"]
    );

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_history_after_reconnect_replaces_feed() {
    let transport = MockTransport::with_scripts(vec![
        dropping(vec![ServerEvent::StreamMessage(message("live", 9))]),
        holding(vec![ServerEvent::StreamMessages(vec![
            message("h2", 2),
            message("h1", 1),
        ])]),
    ]);
    let session = Arc::new(ChatSession::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(
        ConnectionDriver::new(
            transport.clone(),
            Arc::clone(&session),
            fast_backoff(),
            shutdown_rx,
        )
        .run(),
    );

    wait_until(|| session.stats().replacements == 1).await;
    assert_eq!(ids(&session.view(DisplayLimit::All)), vec!["h1", "h2"]);
    assert_eq!(ids(&session.snapshot().messages), vec!["h2", "h1"]);

    let audit = session.audit_log();
    let transitions: Vec<(&str, &str)> = audit
        .iter()
        .filter(|entry| entry.from_state != entry.to_state)
        .map(|entry| (entry.from_state.as_str(), entry.to_state.as_str()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("Disconnected", "Connected"),
            ("Connected", "Disconnected"),
            ("Disconnected", "Connected"),
        ]
    );

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failed_connects_keep_buffer_and_retry() {
    let transport = MockTransport::with_scripts(vec![dropping(vec![
        ServerEvent::StreamMessage(message("kept", 1)),
    ])]);
    let session = Arc::new(ChatSession::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(
        ConnectionDriver::new(
            transport.clone(),
            Arc::clone(&session),
            fast_backoff(),
            shutdown_rx,
        )
        .run(),
    );

    // every later connect fails; the driver keeps going and the feed survives
    wait_until(|| session.audit_log().len() >= 3 && !session.is_connected()).await;
    sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());
    assert_eq!(ids(&session.snapshot().messages), vec!["kept"]);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_dropping_shutdown_sender_stops_driver() {
    let transport = MockTransport::with_scripts(vec![holding(vec![])]);
    let session = Arc::new(ChatSession::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(
        ConnectionDriver::new(transport.clone(), Arc::clone(&session), fast_backoff(), shutdown_rx)
            .run(),
    );

    wait_until(|| session.is_connected()).await;
    drop(shutdown_tx);

    timeout(Duration::from_secs(5), task)
        .await
        .expect("driver did not stop")
        .unwrap()
        .unwrap();
    assert!(transport.closes() >= 1);
}

#[tokio::test]
async fn test_handle_consumers_share_one_connection() {
    let transport = MockTransport::with_scripts(vec![holding(vec![])]);
    let config = SessionConfig::testing("http://127.0.0.1:9");
    let handle = LiveChat::start_with_transport(config, transport.clone()).unwrap();

    wait_until(|| handle.is_connected()).await;
    let mut first = handle.attach();
    let second = handle.attach();
    drop(second);

    handle
        .session()
        .handle(SessionEvent::Message(message("x", 1)));
    let update = timeout(Duration::from_secs(1), first.recv())
        .await
        .unwrap();
    assert_eq!(update, Some(FeedUpdate::MessageAppended(message("x", 1))));

    // detaching consumers never reconnects or closes
    drop(first);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.connects(), 1);
    assert!(handle.is_connected());
    assert!(handle.is_running());

    handle.shutdown().await.unwrap();
    assert!(!handle.is_running());
    assert!(!handle.is_connected());
}

#[tokio::test]
async fn test_global_connection_is_shared_and_restarts_after_shutdown() {
    // Nothing listens on the discard port; the driver just keeps retrying
    let first = LiveChat::global(SessionConfig::testing("http://127.0.0.1:9")).unwrap();
    let again = LiveChat::global(SessionConfig::testing("http://127.0.0.1:10")).unwrap();
    assert!(Arc::ptr_eq(first.session(), again.session()));
    assert_eq!(again.config().server_url, "http://127.0.0.1:9");
    assert!(LiveChat::try_global().is_some());

    // any holder may shut the shared connection down
    again.shutdown().await.unwrap();
    assert!(!first.is_running());
    assert!(LiveChat::try_global().is_none());

    let restarted = LiveChat::global(SessionConfig::testing("http://127.0.0.1:11")).unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(restarted.is_running());
    assert!(!Arc::ptr_eq(first.session(), restarted.session()));
    assert_eq!(restarted.config().server_url, "http://127.0.0.1:11");
    assert!(Arc::ptr_eq(
        LiveChat::try_global().unwrap().session(),
        restarted.session()
    ));

    restarted.shutdown().await.unwrap();
}
