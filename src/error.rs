//! Domain error types for the Arrakis message bus
//!
//! Sprint S-6: Structured thiserror types for navigable diagnostics and
//! compile-time exhaustive handling.
//!
//! Embedding binaries may use anyhow::Result at the process boundary.
//! All library code returns Result<T, BusError>.

use thiserror::Error;

/// Message bus domain errors
///
/// Every variant carries structured context fields for diagnostics.
/// On-call engineers can pattern-match on the variant to understand
/// the failure mode without parsing error message strings.
///
/// Example log output:
/// ```text
/// BusError::PublishRejected { subject: "events.guild.join", .. }
/// → "broker rejected publish to subject 'events.guild.join'"
/// ```
#[derive(Error, Debug)]
pub enum BusError {
    /// Configuration error (missing or invalid field)
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection or JetStream handshake failed
    #[error("NATS connection failed for '{url}'")]
    ConnectFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Stream provisioning called with an empty stream name
    #[error("stream name required")]
    InvalidStreamName,

    /// Stream provisioning called with no subjects
    #[error("at least one subject required for stream '{stream}'")]
    EmptySubjects { stream: String },

    /// Stream create/update failed on the broker
    #[error("failed to provision stream '{stream}'")]
    ProvisionFailed {
        stream: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Payload could not be serialized before publishing
    #[error("payload encoding failed for subject '{subject}'")]
    EncodingFailed {
        subject: String,
        #[source]
        source: serde_json::Error,
    },

    /// Broker rejected or failed to acknowledge a publish
    #[error("broker rejected publish to subject '{subject}'")]
    PublishRejected {
        subject: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No stream retains messages for the requested subject
    #[error("no stream covers subject '{subject}'")]
    StreamNotFound { subject: String },

    /// Consumer registration failed
    #[error("subscribe failed for subject '{subject}' (durable '{durable}')")]
    SubscribeFailed {
        subject: String,
        durable: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Post-registration flush failed or the connection reported dead
    #[error("connection flush failed after subscribe")]
    FlushFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Graceful drain failed during close
    #[error("connection drain failed")]
    DrainFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BusError {
    /// Returns a static label string suitable for Prometheus metrics.
    ///
    /// Used as the `error_type` label on `bus_errors_total` counter,
    /// enabling per-error-type monitoring and alerting.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::ConnectFailed { .. } => "connect",
            Self::InvalidStreamName => "invalid_stream_name",
            Self::EmptySubjects { .. } => "empty_subjects",
            Self::ProvisionFailed { .. } => "provision",
            Self::EncodingFailed { .. } => "encoding",
            Self::PublishRejected { .. } => "publish_rejected",
            Self::StreamNotFound { .. } => "stream_not_found",
            Self::SubscribeFailed { .. } => "subscribe",
            Self::FlushFailed { .. } => "flush",
            Self::DrainFailed { .. } => "drain",
        }
    }
}
