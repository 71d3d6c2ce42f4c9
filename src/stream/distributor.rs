//! Stream Distributor
//!
//! One distributor per named feed. It owns a single upstream connection and
//! fans each decoded event out to every live subscriber.
//!
//! Two tasks cooperate:
//!
//! - the **control task** owns the subscriber slots. Subscribe and unsubscribe
//!   requests reach it over a channel, and each change is published to the
//!   streaming task as an immutable snapshot through a `watch` channel.
//! - the **streaming task** is started on the first subscribe. It owns the
//!   connection, decodes one line at a time and offers the event to each
//!   slot with `try_send`. A full endpoint drops that event for that
//!   subscriber only. When a delivery pass finds no live slot the task
//!   closes the connection and exits; the next subscribe dials again.
//!
//! ```text
//!   subscribe/unsubscribe ──▶ control task ──watch(slots)──▶ streaming task ◀── upstream
//!                                                                 │
//!                                              try_send ◀─────────┴──▶ try_send
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::cache::{RecencyCache, DEFAULT_CACHE_CAPACITY};
use super::codec::JsonReader;
use super::error::{StreamError, StreamResult};

/// A decoded upstream event, shared by every subscriber that receives it
pub type Event = Arc<serde_json::Value>;

/// Index of a subscriber slot; stable until unsubscribed, then reused
pub type SubscriptionId = usize;

/// Delivery endpoint supplied by a subscriber
pub type EventSender = mpsc::Sender<Event>;

type Slots = Arc<Vec<Option<EventSender>>>;

const READ_BUFFER_BYTES: usize = 32 * 1024;

/// Connection and delivery settings for a distributor
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Upstream `host:port`
    pub address: String,
    pub connect_timeout: Duration,
    /// Field whose string value keys the recency cache; `None` disables it
    pub cache_key: Option<String>,
    pub cache_capacity: usize,
    /// Upstream lines longer than this are skipped
    pub max_line_bytes: usize,
    /// Depth of the control task's request queue
    pub control_capacity: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7070".to_string(),
            connect_timeout: Duration::from_secs(5),
            cache_key: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_line_bytes: READ_BUFFER_BYTES,
            control_capacity: 32,
        }
    }
}

/// Lifecycle state of a feed's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No connection
    Idle,
    /// Connected and decoding
    Streaming,
}

/// Point-in-time view of a distributor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStatus {
    pub state: StreamState,
    pub live_subscribers: usize,
    /// Slots allocated so far, live or cleared
    pub slots: usize,
    /// Successful upstream connections since creation
    pub connects: u64,
}

enum Command {
    Subscribe {
        sender: EventSender,
        reply: oneshot::Sender<StreamResult<SubscriptionId>>,
    },
    Unsubscribe {
        id: SubscriptionId,
        reply: oneshot::Sender<StreamResult<()>>,
    },
    Status {
        reply: oneshot::Sender<StreamStatus>,
    },
}

/// Handle to a feed's distributor
///
/// Cloning is cheap; the distributor stops once every handle is dropped.
#[derive(Clone)]
pub struct DataStream {
    name: Arc<str>,
    commands: mpsc::Sender<Command>,
    cache: Option<Arc<Mutex<RecencyCache>>>,
}

impl DataStream {
    /// Start the control task for `name`. Must be called inside a Tokio runtime.
    ///
    /// No connection is made until the first subscriber arrives.
    pub fn spawn(name: impl Into<String>, config: DistributorConfig) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (commands, rx) = mpsc::channel(config.control_capacity.max(1));
        let cache = config
            .cache_key
            .as_ref()
            .map(|key| Arc::new(Mutex::new(RecencyCache::new(key.clone(), config.cache_capacity))));

        let (snapshot, _) = watch::channel(Slots::default());
        let control = Control {
            name: Arc::clone(&name),
            config,
            slots: Vec::new(),
            snapshot,
            cache: cache.clone(),
            streaming: None,
            shutdown: None,
            connects: 0,
        };
        tokio::spawn(control.run(rx));

        Self {
            name,
            commands,
            cache,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a delivery endpoint, connecting upstream if the feed is idle
    ///
    /// A failed dial is returned here and leaves no slot behind.
    pub async fn subscribe(&self, sender: EventSender) -> StreamResult<SubscriptionId> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Subscribe { sender, reply }).await?;
        rx.await.map_err(|_| self.closed())?
    }

    /// Subscribe with a fresh bounded channel of `capacity` events
    pub async fn subscribe_channel(
        &self,
        capacity: usize,
    ) -> StreamResult<(SubscriptionId, mpsc::Receiver<Event>)> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.subscribe(tx).await?;
        Ok((id, rx))
    }

    /// Clear a slot. The endpoint itself is left open.
    ///
    /// Takes effect from the next delivery pass.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> StreamResult<()> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Unsubscribe { id, reply }).await?;
        rx.await.map_err(|_| self.closed())?
    }

    pub async fn status(&self) -> StreamResult<StreamStatus> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Status { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Most recent event whose cache key field equals `key`
    pub fn lookup(&self, key: &str) -> Option<Event> {
        let cache = self.cache.as_ref()?;
        let cache = cache.lock().ok()?;
        cache.get(key)
    }

    async fn request(&self, command: Command) -> StreamResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| self.closed())
    }

    fn closed(&self) -> StreamError {
        StreamError::Closed(self.name.to_string())
    }
}

/// State owned by the control task
struct Control {
    name: Arc<str>,
    config: DistributorConfig,
    slots: Vec<Option<EventSender>>,
    snapshot: watch::Sender<Slots>,
    cache: Option<Arc<Mutex<RecencyCache>>>,
    streaming: Option<JoinHandle<StreamExit>>,
    shutdown: Option<oneshot::Sender<()>>,
    connects: u64,
}

impl Control {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                exit = wait_finished(&mut self.streaming) => {
                    self.streaming = None;
                    self.shutdown = None;
                    tracing::info!(feed = %self.name, ?exit, "Data stream idle");
                    // Someone subscribed while the last pass was tearing down
                    if exit == Some(StreamExit::NoSubscribers) && self.live() > 0 {
                        if let Err(e) = self.start_streaming().await {
                            tracing::error!(feed = %self.name, error = %e, "Failed to reopen data stream");
                        }
                    }
                }
            }
        }

        // Every handle is gone; stop the streaming task too
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        tracing::debug!(feed = %self.name, "Distributor stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Subscribe { sender, reply } => {
                let result = self.subscribe(sender).await;
                let _ = reply.send(result);
            }
            Command::Unsubscribe { id, reply } => {
                let _ = reply.send(self.unsubscribe(id));
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn subscribe(&mut self, sender: EventSender) -> StreamResult<SubscriptionId> {
        let id = match self.slots.iter().position(Option::is_none) {
            Some(id) => id,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.slots[id] = Some(sender);
        self.publish();

        // A task that already hung up has not been reaped yet
        if self
            .streaming
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            self.streaming = None;
            self.shutdown = None;
        }

        if self.streaming.is_none() {
            if let Err(e) = self.start_streaming().await {
                self.slots[id] = None;
                self.publish();
                tracing::error!(feed = %self.name, error = %e, "Failed to open data stream");
                return Err(e);
            }
        }

        tracing::info!(feed = %self.name, subscription_id = id, "Adding subscriber to data stream");
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> StreamResult<()> {
        match self.slots.get_mut(id) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.publish();
                tracing::info!(feed = %self.name, subscription_id = id, "Dropping subscriber");
                Ok(())
            }
            _ => Err(StreamError::UnknownSubscription(id)),
        }
    }

    fn status(&self) -> StreamStatus {
        let streaming = self
            .streaming
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        StreamStatus {
            state: if streaming {
                StreamState::Streaming
            } else {
                StreamState::Idle
            },
            live_subscribers: self.live(),
            slots: self.slots.len(),
            connects: self.connects,
        }
    }

    fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn publish(&self) {
        self.snapshot.send_replace(Arc::new(self.slots.clone()));
    }

    async fn start_streaming(&mut self) -> StreamResult<()> {
        let reader = connect(&self.name, &self.config).await?;
        self.connects += 1;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = StreamTask {
            name: Arc::clone(&self.name),
            reader: JsonReader::new(reader).with_max_line_bytes(self.config.max_line_bytes),
            slots: self.snapshot.subscribe(),
            cache: self.cache.clone(),
        };
        self.streaming = Some(tokio::spawn(task.run(shutdown_rx)));
        self.shutdown = Some(shutdown_tx);

        tracing::info!(feed = %self.name, address = %self.config.address, "Data stream connected");
        Ok(())
    }
}

/// Resolves when the streaming task exits; never while there is none
async fn wait_finished(handle: &mut Option<JoinHandle<StreamExit>>) -> Option<StreamExit> {
    match handle {
        Some(handle) => match handle.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                tracing::error!(error = %e, "Streaming task failed");
                None
            }
        },
        None => std::future::pending().await,
    }
}

/// Why a streaming task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamExit {
    /// A delivery pass found no live slot
    NoSubscribers,
    /// End of stream or a fatal read error
    UpstreamClosed,
    Shutdown,
}

/// Dial the upstream and announce the feed name
async fn connect(name: &str, config: &DistributorConfig) -> StreamResult<BufReader<TcpStream>> {
    let mut stream = tokio::time::timeout(
        config.connect_timeout,
        TcpStream::connect(config.address.as_str()),
    )
    .await
    .map_err(|_| StreamError::ConnectTimeout {
        address: config.address.clone(),
        timeout: config.connect_timeout,
    })?
    .map_err(|source| StreamError::Connect {
        address: config.address.clone(),
        source,
    })?;

    let handshake = format!("{}\n", name);
    stream
        .write_all(handshake.as_bytes())
        .await
        .map_err(|source| StreamError::Handshake {
            feed: name.to_string(),
            source,
        })?;

    Ok(BufReader::with_capacity(READ_BUFFER_BYTES, stream))
}

/// State owned by the streaming task, including the connection
struct StreamTask {
    name: Arc<str>,
    reader: JsonReader<BufReader<TcpStream>>,
    slots: watch::Receiver<Slots>,
    cache: Option<Arc<Mutex<RecencyCache>>>,
}

impl StreamTask {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> StreamExit {
        let exit = loop {
            let next = tokio::select! {
                _ = &mut shutdown => break StreamExit::Shutdown,
                next = self.reader.read() => next,
            };

            let event: Event = match next {
                Ok(Some(value)) => Arc::new(value),
                Ok(None) => {
                    tracing::info!(feed = %self.name, "Upstream closed the data stream");
                    break StreamExit::UpstreamClosed;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(feed = %self.name, error = %e, "Skipping undecodable line");
                    continue;
                }
                Err(e) => {
                    tracing::error!(feed = %self.name, error = %e, "Failed reading data stream");
                    break StreamExit::UpstreamClosed;
                }
            };

            if let Some(cache) = &self.cache {
                if let Ok(mut cache) = cache.lock() {
                    cache.record(&event);
                }
            }

            let slots = self.slots.borrow().clone();
            if deliver(&self.name, &slots, &event) == 0 {
                tracing::info!(feed = %self.name, "No subscribers left, closing data stream");
                break StreamExit::NoSubscribers;
            }
        };
        // Dropping the reader closes the connection
        tracing::debug!(feed = %self.name, "All done with data stream");
        exit
    }
}

/// Offer `event` to every live slot without waiting; returns the live count
fn deliver(feed: &str, slots: &[Option<EventSender>], event: &Event) -> usize {
    let mut live = 0;
    for (id, slot) in slots.iter().enumerate() {
        let Some(sender) = slot else {
            continue;
        };
        live += 1;
        match sender.try_send(Arc::clone(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(feed, subscription_id = id, "Subscriber lagging, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(feed, subscription_id = id, "Subscriber endpoint closed");
            }
        }
    }
    live
}
