//! Bridge runner for lifecycle management.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::AsyncClient;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use serialgw_common::{LoggingConfig, connect, init_tracing, qos_from_level};

use crate::BridgeArgs;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::publisher::Publisher;
use crate::stats::BridgeStats;
use crate::status::{StatusPublisher, last_will_payload};
use crate::subscriber::{BusMessage, EventLoopDriver};

/// How long shutdown waits for queued messages to reach the broker.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Collaborators are being set up.
    Starting,
    /// Workers are running.
    Running,
    /// Collaborators are being released.
    ShuttingDown,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeState::Starting => write!(f, "starting"),
            BridgeState::Running => write!(f, "running"),
            BridgeState::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

/// Why the bridge left the running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Operator interrupt.
    Signal,
    /// A worker hit an unrecoverable fault.
    Fault(String),
}

/// Bridge runner that manages the lifecycle of an MQTT bridge.
///
/// Handles:
/// - Logging initialization
/// - MQTT client creation and event loop driving
/// - Task spawning and management
/// - Graceful shutdown on Ctrl+C or worker fault
/// - Status publishing (optional)
///
/// # Example
///
/// ```ignore
/// use serialgw_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let args = BridgeArgs::parse_with_default("mybridge.json5");
///     let config = MyBridgeConfig::load(&args.config)?;
///
///     let mut runner = BridgeRunner::new_with_args("mybridge", config, Some(&args))?;
///     runner.subscribe("commands/#");
///
///     let inbound = runner.take_inbound().unwrap();
///     let publisher = runner.publisher();
///     runner.spawn(async move {
///         // Worker logic here
///     });
///
///     runner.run().await
/// }
/// ```
pub struct BridgeRunner<C: BridgeConfig> {
    /// Bridge name for logging and status.
    name: String,
    /// Bridge version.
    version: String,
    /// The loaded configuration.
    config: C,
    /// MQTT client handle.
    client: AsyncClient,
    /// Publisher for bridge messages.
    publisher: Publisher,
    /// Event loop driver, until the runner starts it.
    driver: Option<EventLoopDriver>,
    /// Inbound bus messages, until a worker takes them.
    inbound: Option<mpsc::Receiver<BusMessage>>,
    /// Status publisher (optional).
    status_publisher: Option<StatusPublisher>,
    /// Shared traffic counters.
    stats: Arc<BridgeStats>,
    /// Spawned tasks.
    tasks: Vec<JoinHandle<()>>,
    /// Tells workers to stop.
    shutdown_tx: watch::Sender<bool>,
    /// Worker faults.
    fault_tx: mpsc::UnboundedSender<String>,
    fault_rx: mpsc::UnboundedReceiver<String>,
    /// Current lifecycle state.
    state: BridgeState,
}

impl<C: BridgeConfig> BridgeRunner<C> {
    /// Create a new bridge runner.
    ///
    /// This will:
    /// 1. Initialize logging based on config
    /// 2. Create the MQTT client (the connection is made once running)
    pub fn new(name: impl Into<String>, config: C) -> Result<Self> {
        Self::new_with_args(name, config, None)
    }

    /// Create a new bridge runner with CLI args for log level override.
    pub fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&BridgeArgs>,
    ) -> Result<Self> {
        // Initialize logging with optional CLI override
        let log_config = match args.and_then(|a| a.log_level) {
            Some(level) => LoggingConfig {
                level,
                ..config.logging().clone()
            },
            None => config.logging().clone(),
        };

        init_tracing(&log_config).map_err(|e| BridgeError::config(e.to_string()))?;

        Self::with_config(name, config)
    }

    /// Create a runner without touching the global logger.
    pub fn with_config(name: impl Into<String>, config: C) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        tracing::info!(bridge = %name, version = %version, "Starting bridge");

        let mqtt = config.mqtt();
        let qos = qos_from_level(mqtt.qos)?;

        let last_will = config
            .status_topic()
            .map(|topic| (topic.to_string(), last_will_payload(&name, &version)));

        let (client, eventloop) = connect(mqtt, last_will)?;

        let (inbound_tx, inbound_rx) = mpsc::channel(mqtt.request_capacity);
        let driver = EventLoopDriver::new(
            eventloop,
            client.clone(),
            qos,
            Duration::from_secs(mqtt.reconnect_delay_secs),
            inbound_tx,
        );

        let publisher = Publisher::new(client.clone(), qos);

        let status_publisher = config.status_topic().map(|topic| {
            StatusPublisher::new(publisher.clone(), topic, name.clone(), version.clone())
        });

        let (shutdown_tx, _) = watch::channel(false);
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();

        Ok(Self {
            name,
            version,
            config,
            client,
            publisher,
            driver: Some(driver),
            inbound: Some(inbound_rx),
            status_publisher,
            stats: Arc::new(BridgeStats::new()),
            tasks: Vec::new(),
            shutdown_tx,
            fault_tx,
            fault_rx,
            state: BridgeState::Starting,
        })
    }

    /// Get the bridge name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the bridge version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Get a clone of the publisher.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Get the shared traffic counters.
    pub fn stats(&self) -> Arc<BridgeStats> {
        self.stats.clone()
    }

    /// Subscribe to a topic filter once connected (and after every reconnect).
    pub fn subscribe(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        match self.driver.as_mut() {
            Some(driver) => driver.subscribe(filter),
            None => {
                tracing::warn!(filter = %filter, "Event loop already running, ignoring subscription")
            }
        }
    }

    /// Take the receiver of inbound bus messages.
    ///
    /// Returns `None` if it was already taken.
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<BusMessage>> {
        self.inbound.take()
    }

    /// Get a receiver that flips to `true` when the bridge shuts down.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Spawn a worker task.
    ///
    /// The task will be tracked and aborted on shutdown.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.tasks.push(handle);
    }

    /// Spawn a worker task that returns a Result.
    ///
    /// An error is logged and shuts the bridge down.
    pub fn spawn_with_error<F, E>(&mut self, name: String, future: F)
    where
        F: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let fault_tx = self.fault_tx.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = future.await {
                tracing::error!(worker = %name, error = %e, "Worker failed");
                let _ = fault_tx.send(format!("{}: {}", name, e));
            }
        });
        self.tasks.push(handle);
    }

    /// Run the bridge until Ctrl+C is received or a worker fails.
    pub async fn run(self) -> Result<()> {
        self.run_with_metadata(None).await
    }

    /// Run the bridge with custom status metadata.
    pub async fn run_with_metadata(self, metadata: Option<serde_json::Value>) -> Result<()> {
        let interrupt = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(interrupt, metadata).await
    }

    /// Run the bridge until `interrupt` completes or a worker fails.
    ///
    /// This will:
    /// 1. Start the MQTT event loop
    /// 2. Publish "running" status (if enabled)
    /// 3. Wait for the interrupt or a worker fault
    /// 4. Signal and abort all spawned tasks
    /// 5. Publish "offline" (or "error") status (if enabled)
    /// 6. Disconnect from the broker
    ///
    /// Returns an error if the bridge stopped because of a worker fault.
    pub async fn run_until<F>(
        mut self,
        interrupt: F,
        metadata: Option<serde_json::Value>,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut driver_handle = self.driver.take().map(|driver| tokio::spawn(driver.run()));

        self.state = BridgeState::Running;

        if let Some(ref status_pub) = self.status_publisher {
            if let Err(e) = status_pub.publish_running(metadata) {
                tracing::warn!(error = %e, "Failed to publish running status");
            }
        }

        tracing::info!(
            bridge = %self.name,
            state = %self.state,
            tasks = self.tasks.len(),
            "Bridge running. Press Ctrl+C to stop."
        );

        let reason = tokio::select! {
            _ = interrupt => ShutdownReason::Signal,
            Some(fault) = self.fault_rx.recv() => ShutdownReason::Fault(fault),
        };

        self.state = BridgeState::ShuttingDown;
        match &reason {
            ShutdownReason::Signal => {
                tracing::info!(bridge = %self.name, state = %self.state, "Received shutdown signal")
            }
            ShutdownReason::Fault(fault) => tracing::error!(
                bridge = %self.name,
                state = %self.state,
                fault = %fault,
                "Shutting down after fault"
            ),
        }

        // Stop workers
        let _ = self.shutdown_tx.send(true);
        for task in &self.tasks {
            task.abort();
        }

        // Wait briefly for tasks to clean up
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = self.stats.snapshot();

        if let Some(ref status_pub) = self.status_publisher {
            let published = match &reason {
                ShutdownReason::Signal => {
                    status_pub.publish_offline(serde_json::to_value(&snapshot).ok())
                }
                ShutdownReason::Fault(fault) => status_pub.publish_error(fault.clone()),
            };
            if let Err(e) = published {
                tracing::warn!(error = %e, "Failed to publish offline status");
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            tracing::warn!(error = %e, "Error disconnecting from MQTT broker");
        }

        // Let the event loop flush the status and disconnect
        if let Some(handle) = driver_handle.as_mut() {
            if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, &mut *handle).await.is_err() {
                tracing::debug!("MQTT event loop did not stop in time, aborting");
                handle.abort();
            }
        }

        tracing::info!(
            bridge = %self.name,
            lines_read = snapshot.lines_read,
            lines_dropped = snapshot.lines_dropped,
            fields_published = snapshot.fields_published,
            publish_failures = snapshot.publish_failures,
            messages_received = snapshot.messages_received,
            frames_written = snapshot.frames_written,
            write_failures = snapshot.write_failures,
            "Goodbye!"
        );

        match reason {
            ShutdownReason::Signal => Ok(()),
            ShutdownReason::Fault(fault) => Err(BridgeError::worker(fault)),
        }
    }
}
