//! NATS JetStream message bus
//!
//! Sprint S-5: Durable messaging core.
//! Owns the broker connection and the JetStream context shared by
//! publish, stream provisioning and subscription registration.

mod publisher;
mod registry;
mod subscriber;

pub use subscriber::{Delivery, HandlerError};

use crate::config::BusConfig;
use crate::error::BusError;
use crate::metrics::BusMetrics;
use async_nats::jetstream::{self, Context as JsContext};
use async_nats::{Client, ConnectOptions};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Durable message bus backed by NATS JetStream
///
/// One bus instance per process is the expected shape: publishers and
/// subscribers share the single connection and its JetStream context.
/// All operations take `&self` and are safe to call concurrently.
pub struct MessageBus {
    client: Client,
    jetstream: JsContext,
    config: BusConfig,
    metrics: Arc<BusMetrics>,
    connected: AtomicBool,
    messages_published: AtomicU64,
    publish_failures: AtomicU64,
    /// Live delivery loops, reaped on close
    subscriptions: DashMap<String, JoinHandle<()>>,
}

impl MessageBus {
    /// Connect to the broker with a freshly installed metrics recorder
    pub async fn connect(config: BusConfig) -> Result<Arc<Self>, BusError> {
        Self::connect_with_metrics(config, Arc::new(BusMetrics::new())).await
    }

    /// Connect to the broker, recording into the given metrics collector
    ///
    /// Validates required configuration fields before any network I/O and
    /// applies defaults for timeout and reconnect policy. The JetStream
    /// context is opened lazily by the client; a broker without JetStream
    /// enabled surfaces on the first stream operation.
    pub async fn connect_with_metrics(
        config: BusConfig,
        metrics: Arc<BusMetrics>,
    ) -> Result<Arc<Self>, BusError> {
        config.validate()?;
        let config = config.normalized();

        info!(url = %config.url, name = %config.name, "Connecting to NATS");

        let options = ConnectOptions::new()
            .name(&config.name)
            .user_and_password(config.user.clone(), config.password.clone())
            .connection_timeout(config.timeout)
            .max_reconnects(config.max_reconnect);

        let client = async_nats::connect_with_options(config.url.clone(), options)
            .await
            .map_err(|e| BusError::ConnectFailed {
                url: config.url.clone(),
                source: Box::new(e),
            })?;

        let jetstream = jetstream::new(client.clone());

        metrics.set_connected(true);
        info!("Connected to NATS JetStream");

        Ok(Arc::new(Self {
            client,
            jetstream,
            config,
            metrics,
            connected: AtomicBool::new(true),
            messages_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            subscriptions: DashMap::new(),
        }))
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get total messages published
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Get total publish failures
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Client display name from configuration
    pub fn client_name(&self) -> &str {
        &self.config.name
    }

    /// Metrics collector shared with this bus
    pub fn metrics(&self) -> &BusMetrics {
        &self.metrics
    }

    /// JetStream context for advanced operations
    ///
    /// Escape hatch for stream inspection and administrative calls the
    /// bus interface does not cover.
    pub fn jetstream(&self) -> &JsContext {
        &self.jetstream
    }

    /// Graceful shutdown
    ///
    /// Drains the connection (no new deliveries, in-flight acks allowed
    /// to complete), then reaps the delivery loops. No-op when already
    /// closed. A drain failure is returned to the caller and the bus
    /// stays open; close may be called again.
    pub async fn close(&self) -> Result<(), BusError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        info!("Closing NATS connection");

        self.client
            .drain()
            .await
            .map_err(|e| BusError::DrainFailed {
                source: Box::new(e),
            })?;

        self.connected.store(false, Ordering::SeqCst);
        self.metrics.set_connected(false);

        // Delivery loops end when their message streams drain; abort any
        // that are still parked waiting for messages.
        for entry in self.subscriptions.iter() {
            entry.value().abort();
        }
        self.subscriptions.clear();

        info!("NATS connection closed");
        Ok(())
    }

    /// Track a delivery loop for shutdown
    ///
    /// Keyed by consumer name plus a unique suffix: several queue-group
    /// members in one process share a consumer name but own separate
    /// delivery loops.
    pub(crate) fn track_subscription(&self, consumer_name: &str, task: JoinHandle<()>) {
        let key = format!("{consumer_name}-{}", uuid::Uuid::new_v4());
        self.subscriptions.insert(key, task);
    }
}
