//! Process-wide live chat registry
//!
//! One connection serves every consumer in the process. Consumers attach and
//! detach freely; only an explicit shutdown closes the connection, and the
//! next `LiveChat::global` call after that starts a new one.

use livechat_core::{
    ChatMessage, ChatSession, DisplayLimit, FeedUpdate, SessionConfig, SessionSnapshot,
    Subscription,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::driver::ConnectionDriver;
use crate::error::{Result, RuntimeError};
use crate::socketio::SocketIoTransport;
use crate::transport::Transport;

/// Time a shutdown waits for the driver to finish before aborting it
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

static GLOBAL: Mutex<Option<LiveChatHandle>> = Mutex::new(None);

// ----------------------------------------------------------------------------
// Entry Points
// ----------------------------------------------------------------------------

/// Constructors for live chat connections
pub struct LiveChat;

impl LiveChat {
    /// Process-wide connection, started on first use
    ///
    /// The first call validates `config` and spawns the connection; later
    /// calls return the same handle and ignore their argument while it is
    /// running. Once the shared connection has been shut down, the next call
    /// starts a fresh one from its own `config`. Must be called from within a
    /// Tokio runtime.
    pub fn global(config: SessionConfig) -> Result<LiveChatHandle> {
        let mut slot = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref() {
            if handle.is_running() {
                debug!("Reusing process-wide live chat connection");
                return Ok(handle.clone());
            }
            info!("Process-wide live chat connection stopped, starting a new one");
        }

        let handle = Self::start(config)?;
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Process-wide connection if one is running
    pub fn try_global() -> Option<LiveChatHandle> {
        GLOBAL
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|handle| handle.is_running())
            .cloned()
    }

    /// Independent connection over the Socket.IO transport
    pub fn start(config: SessionConfig) -> Result<LiveChatHandle> {
        config.validate()?;
        let transport = SocketIoTransport::new(&config)?;
        Self::start_with_transport(config, transport)
    }

    /// Independent connection over any transport
    pub fn start_with_transport<T>(config: SessionConfig, transport: T) -> Result<LiveChatHandle>
    where
        T: Transport + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| RuntimeError::NoAsyncRuntime(error.to_string()))?;

        let session = Arc::new(ChatSession::new(
            config.feed.clone(),
            config.update_channel_capacity,
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = ConnectionDriver::new(
            transport,
            Arc::clone(&session),
            Backoff::from_config(&config),
            shutdown_rx,
        );

        let task = runtime.spawn(driver.run());
        info!("Live chat connection started for {}", config.server_url);

        Ok(LiveChatHandle {
            inner: Arc::new(HandleInner {
                config,
                session,
                shutdown: shutdown_tx,
                task: Mutex::new(Some(task)),
            }),
        })
    }
}

// ----------------------------------------------------------------------------
// Handle
// ----------------------------------------------------------------------------

struct HandleInner {
    config: SessionConfig,
    session: Arc<ChatSession>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<Result<()>>>>,
}

/// Cloneable handle to a running live chat connection
#[derive(Clone)]
pub struct LiveChatHandle {
    inner: Arc<HandleInner>,
}

impl LiveChatHandle {
    /// Register a new consumer on the shared session
    pub fn attach(&self) -> FeedConsumer {
        FeedConsumer {
            session: Arc::clone(&self.inner.session),
            subscription: self.inner.session.subscribe(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<ChatSession> {
        &self.inner.session
    }

    pub fn is_connected(&self) -> bool {
        self.inner.session.is_connected()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.session.snapshot()
    }

    pub fn view(&self, limit: DisplayLimit) -> Vec<ChatMessage> {
        self.inner.session.view(limit)
    }

    /// Whether the connection driver is still running
    pub fn is_running(&self) -> bool {
        self.task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the connection and wait for the driver to exit
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down live chat connection");
        self.signal_shutdown();

        let task = self.task().take();
        let Some(mut task) = task else {
            return Ok(());
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                warn!("Connection driver task failed: {}", error);
                Ok(())
            }
            Err(_) => {
                warn!("Connection driver did not stop in time, aborting");
                task.abort();
                Err(RuntimeError::Timeout(SHUTDOWN_GRACE))
            }
        }
    }

    fn signal_shutdown(&self) {
        // Receiver already gone means the driver has exited
        let _ = self.inner.shutdown.send(true);
    }

    fn task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<Result<()>>>> {
        self.inner.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LiveChatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveChatHandle")
            .field("server_url", &self.inner.config.server_url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Consumer
// ----------------------------------------------------------------------------

/// One attached consumer of the shared feed
///
/// Dropping a consumer unregisters its listener and nothing else.
#[derive(Debug)]
pub struct FeedConsumer {
    session: Arc<ChatSession>,
    subscription: Subscription,
}

impl FeedConsumer {
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn view(&self, limit: DisplayLimit) -> Vec<ChatMessage> {
        self.session.view(limit)
    }

    /// Wait for the next feed update
    pub async fn recv(&mut self) -> Option<FeedUpdate> {
        self.subscription.recv().await
    }

    pub fn try_recv(&mut self) -> Option<FeedUpdate> {
        self.subscription.try_recv()
    }
}
