//! Arrakis Bus - durable NATS JetStream messaging for Arrakis services
//!
//! Sprint S-5: Durable Message Bus
//!
//! This is the shared messaging layer that:
//! - Owns one authenticated broker connection per process
//! - Provisions durable, file-backed streams idempotently
//! - Publishes bytes, text or JSON with broker storage confirmation
//! - Registers durable (optionally queue-grouped) subscriptions with
//!   manual ack semantics derived from handler outcomes
//! - Exports Prometheus metrics for observability
//!
//! Delivery guarantees, persistence and redelivery retry all live in the
//! broker; this crate is configuration plumbing and interface
//! translation.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use arrakis_bus::{BusConfig, MessageBus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arrakis_bus::BusError> {
//!     let config = BusConfig::new("nats://localhost:4222", "billing", "svc", "secret");
//!     let bus = MessageBus::connect(config).await?;
//!
//!     bus.ensure_stream("EVENTS", &["events.>"]).await?;
//!
//!     bus.subscribe("events.guild.join", "billing-worker", None, |delivery, payload| async move {
//!         tracing::info!(?payload, attempt = delivery.attempt, "guild joined");
//!         Ok(())
//!     })
//!     .await?;
//!
//!     bus.publish("events.guild.join", serde_json::json!({ "guild_id": "123" }))
//!         .await?;
//!
//!     bus.close().await
//! }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod telemetry;

pub use bus::{Delivery, HandlerError, MessageBus};
pub use config::BusConfig;
pub use error::BusError;
pub use metrics::BusMetrics;
pub use payload::Payload;
