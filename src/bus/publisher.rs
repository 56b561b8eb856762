//! Message publishing
//!
//! Sprint S-5: Fire-and-confirm publishing to JetStream.
//! The publish call returns once the broker confirms durable storage;
//! there is no retry at this layer.

use super::MessageBus;
use crate::error::BusError;
use crate::payload::Payload;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{debug, warn};

impl MessageBus {
    /// Publish a payload to a subject within its provisioned stream
    ///
    /// Encoding policy: bytes pass through unchanged, text is sent as its
    /// UTF-8 bytes, JSON documents are serialized. A serialization
    /// failure aborts the publish with nothing sent. Broker rejection
    /// (including no stream retaining the subject) surfaces as
    /// [`BusError::PublishRejected`] wrapping the cause.
    ///
    /// For a single publisher, messages to the same subject are stored in
    /// submission order; no ordering holds across subjects or publishers.
    pub async fn publish(
        &self,
        subject: &str,
        payload: impl Into<Payload>,
    ) -> Result<(), BusError> {
        let payload = payload.into();

        let bytes = match payload.encode() {
            Ok(bytes) => bytes,
            Err(source) => {
                self.publish_failures.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_publish_failure(subject);
                return Err(BusError::EncodingFailed {
                    subject: subject.to_string(),
                    source,
                });
            }
        };

        let start = Instant::now();

        debug!(subject, bytes = bytes.len(), "Publishing message");

        let ack = self
            .jetstream
            .publish(subject.to_string(), bytes.into())
            .await;

        // First await submits; the second waits for the broker to confirm
        // the message hit durable storage.
        let result = match ack {
            Ok(ack_future) => ack_future.await,
            Err(e) => Err(e),
        };

        match result {
            Ok(ack) => {
                self.messages_published.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_publish(subject, start.elapsed());
                debug!(
                    subject,
                    stream = %ack.stream,
                    seq = ack.sequence,
                    "Message committed"
                );
                Ok(())
            }
            Err(e) => {
                self.publish_failures.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_publish_failure(subject);
                warn!(subject, error = %e, "Failed to publish message");
                Err(BusError::PublishRejected {
                    subject: subject.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
}
