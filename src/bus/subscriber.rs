//! Durable subscriptions
//!
//! Sprint S-5: Consumer registration and the per-delivery pipeline.
//! Subscriptions are durable pull consumers; the broker redelivers
//! anything the handler fails, subject to its own backoff policy.

use super::MessageBus;
use crate::error::BusError;
use crate::payload::Payload;
use async_nats::connection::State;
use async_nats::jetstream::consumer::pull::Config as PullConsumerConfig;
use async_nats::jetstream::consumer::{AckPolicy, PullConsumer};
use async_nats::jetstream::AckKind;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long the broker waits for an ack before redelivering
const ACK_WAIT: Duration = Duration::from_secs(30);

/// Unacknowledged deliveries in flight before the broker pauses the
/// subscription (backpressure)
const MAX_ACK_PENDING: i64 = 1000;

/// Error type returned by application handlers
///
/// Only the success/failure of the handler drives the ack decision; the
/// error itself is logged and otherwise opaque to the bus.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Context for a single delivery
///
/// Built fresh per message and owned by the handler for the duration of
/// one invocation; nothing here is shared across deliveries.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Process-local delivery identifier, for log correlation
    pub delivery_id: Uuid,
    /// Subject the message arrived on
    pub subject: String,
    /// Broker-side delivery attempt, starting at 1 (>1 means redelivery)
    pub attempt: u64,
}

/// Terminal state for one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AckDecision {
    Ack,
    Nak,
}

/// Derive the ack decision from a handler outcome
pub(crate) fn ack_decision(outcome: &Result<(), HandlerError>) -> AckDecision {
    match outcome {
        Ok(()) => AckDecision::Ack,
        Err(_) => AckDecision::Nak,
    }
}

impl MessageBus {
    /// Register a durable subscription on a subject
    ///
    /// With `queue_group` set, all members of the group bind one shared
    /// durable consumer and compete for deliveries: each message reaches
    /// exactly one member. Without it, the durable named `durable`
    /// receives every matching message, independently of other durables
    /// on the same subject.
    ///
    /// Acknowledgement is manual: the handler's `Ok` acks the delivery,
    /// `Err` negatively acknowledges it and the broker schedules a
    /// redelivery. Payload decode problems never fail a delivery; the
    /// handler sees the raw text or bytes instead.
    ///
    /// The stream retaining `subject` must already exist (see
    /// [`MessageBus::ensure_stream`]).
    pub async fn subscribe<H, F>(
        &self,
        subject: &str,
        durable: &str,
        queue_group: Option<&str>,
        handler: H,
    ) -> Result<(), BusError>
    where
        H: Fn(Delivery, Payload) -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        // Queue-group members share one consumer; exclusive durables own
        // theirs.
        let consumer_name = queue_group.unwrap_or(durable).to_string();

        let stream_name = self
            .find_stream_name(subject)
            .await
            .map_err(|source| BusError::SubscribeFailed {
                subject: subject.to_string(),
                durable: durable.to_string(),
                source,
            })?
            .ok_or_else(|| BusError::StreamNotFound {
                subject: subject.to_string(),
            })?;

        let stream = self.jetstream.get_stream(&stream_name).await.map_err(|e| {
            BusError::SubscribeFailed {
                subject: subject.to_string(),
                durable: durable.to_string(),
                source: Box::new(e),
            }
        })?;

        let consumer: PullConsumer = stream
            .get_or_create_consumer(
                &consumer_name,
                PullConsumerConfig {
                    durable_name: Some(consumer_name.clone()),
                    filter_subject: subject.to_string(),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: ACK_WAIT,
                    max_ack_pending: MAX_ACK_PENDING,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BusError::SubscribeFailed {
                subject: subject.to_string(),
                durable: durable.to_string(),
                source: Box::new(e),
            })?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| BusError::SubscribeFailed {
                subject: subject.to_string(),
                durable: durable.to_string(),
                source: Box::new(e),
            })?;

        let metrics = Arc::clone(&self.metrics);
        let loop_subject = subject.to_string();
        let loop_consumer = consumer_name.clone();

        let task = tokio::spawn(async move {
            while let Some(result) = messages.next().await {
                let message = match result {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(
                            subject = %loop_subject,
                            consumer = %loop_consumer,
                            error = %e,
                            "Error receiving delivery"
                        );
                        continue;
                    }
                };

                let payload = Payload::decode(&message.payload);
                let attempt = message
                    .info()
                    .map(|info| info.delivered.max(1) as u64)
                    .unwrap_or(1);

                // Fresh context per delivery; handlers never observe
                // state from a previous invocation.
                let delivery = Delivery {
                    delivery_id: Uuid::new_v4(),
                    subject: message.subject.to_string(),
                    attempt,
                };
                let delivery_id = delivery.delivery_id;

                let start = Instant::now();
                let outcome = handler(delivery, payload).await;
                let elapsed = start.elapsed();

                match ack_decision(&outcome) {
                    AckDecision::Ack => {
                        // Ack loss is safe: the broker redelivers and the
                        // handler contract is at-least-once.
                        if let Err(e) = message.ack().await {
                            warn!(%delivery_id, error = %e, "Failed to ack delivery");
                        }
                        metrics.record_delivery(&loop_subject, "ack", elapsed);
                    }
                    AckDecision::Nak => {
                        if let Err(ref error) = outcome {
                            warn!(
                                subject = %loop_subject,
                                %delivery_id,
                                attempt,
                                error = %error,
                                "Handler failed, delivery scheduled for redelivery"
                            );
                        }
                        if let Err(e) = message.ack_with(AckKind::Nak(None)).await {
                            warn!(%delivery_id, error = %e, "Failed to nak delivery");
                        }
                        metrics.record_delivery(&loop_subject, "nak", elapsed);
                    }
                }
            }

            debug!(subject = %loop_subject, consumer = %loop_consumer, "Delivery loop ended");
        });

        self.track_subscription(&consumer_name, task);

        // Flush the outbound buffer so broker-side rejections that do not
        // fail the registration call become observable now, not on the
        // first delivery.
        self.client
            .flush()
            .await
            .map_err(|e| BusError::FlushFailed {
                source: Box::new(e),
            })?;

        if self.client.connection_state() != State::Connected {
            return Err(BusError::FlushFailed {
                source: "connection left connected state during subscribe".into(),
            });
        }

        info!(
            subject,
            durable,
            queue_group = queue_group.unwrap_or("-"),
            "Subscribed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_error() -> HandlerError {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, "handler failed"))
    }

    #[test]
    fn success_outcome_acks() {
        assert_eq!(ack_decision(&Ok(())), AckDecision::Ack);
    }

    #[test]
    fn failure_outcome_naks() {
        assert_eq!(ack_decision(&Err(handler_error())), AckDecision::Nak);
    }

    #[test]
    fn deliveries_carry_independent_ids() {
        let a = Delivery {
            delivery_id: Uuid::new_v4(),
            subject: "events.join".to_string(),
            attempt: 1,
        };
        let b = Delivery {
            delivery_id: Uuid::new_v4(),
            subject: "events.join".to_string(),
            attempt: 1,
        };
        assert_ne!(a.delivery_id, b.delivery_id);
    }
}
