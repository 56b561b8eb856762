//! Stream provisioning
//!
//! Sprint S-5: Idempotent stream registry.
//! Every subject-owning service calls [`MessageBus::ensure_stream`] on
//! startup; the broker is the authority for stream state, so repeated
//! calls from any number of processes converge without coordination.

use super::MessageBus;
use crate::error::BusError;
use async_nats::jetstream::stream::{Config as StreamConfig, RetentionPolicy, StorageType};
use futures::TryStreamExt;
use std::collections::HashSet;
use tracing::{debug, info};

impl MessageBus {
    /// Ensure a durable stream exists covering the given subjects
    ///
    /// Creates the stream on first call: file-backed storage, one
    /// replica, limits-based retention with no message-count or byte cap.
    /// On later calls the stream's subject set is widened to the union of
    /// its configured subjects and the requested ones; storage,
    /// replication and retention settings are preserved. Provisioning
    /// never removes subjects.
    pub async fn ensure_stream(&self, name: &str, subjects: &[&str]) -> Result<(), BusError> {
        if name.is_empty() {
            return Err(BusError::InvalidStreamName);
        }
        if subjects.is_empty() {
            return Err(BusError::EmptySubjects {
                stream: name.to_string(),
            });
        }

        let requested: Vec<String> = subjects.iter().map(|s| s.to_string()).collect();

        match self.jetstream.get_stream(name).await {
            Ok(mut stream) => {
                let info = stream.info().await.map_err(|e| BusError::ProvisionFailed {
                    stream: name.to_string(),
                    source: Box::new(e),
                })?;

                let merged = merge_subjects(&info.config.subjects, &requested);
                if merged.len() == info.config.subjects.len() {
                    debug!(stream = name, "stream already covers requested subjects");
                    return Ok(());
                }

                let mut config = info.config.clone();
                config.subjects = merged;

                self.jetstream
                    .update_stream(&config)
                    .await
                    .map_err(|e| BusError::ProvisionFailed {
                        stream: name.to_string(),
                        source: Box::new(e),
                    })?;

                info!(
                    stream = name,
                    subjects = config.subjects.len(),
                    "stream subjects widened"
                );
            }
            Err(_) => {
                // Stream does not exist yet
                let config = StreamConfig {
                    name: name.to_string(),
                    subjects: requested,
                    retention: RetentionPolicy::Limits,
                    storage: StorageType::File,
                    num_replicas: 1,
                    max_messages: -1,
                    max_bytes: -1,
                    ..Default::default()
                };

                self.jetstream
                    .create_stream(config)
                    .await
                    .map_err(|e| BusError::ProvisionFailed {
                        stream: name.to_string(),
                        source: Box::new(e),
                    })?;

                info!(stream = name, "stream created");
            }
        }

        Ok(())
    }

    /// Find the stream whose subject set covers the given subject
    pub(crate) async fn find_stream_name(
        &self,
        subject: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let mut streams = self.jetstream.streams();
        while let Some(info) = streams.try_next().await? {
            if info
                .config
                .subjects
                .iter()
                .any(|pattern| subject_matches(pattern, subject))
            {
                return Ok(Some(info.config.name));
            }
        }
        Ok(None)
    }
}

/// Union of existing and requested subjects
///
/// Existing subjects keep their position; new ones are appended in
/// request order. Result length equals the existing length exactly when
/// the request added nothing.
pub(crate) fn merge_subjects(existing: &[String], requested: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(existing.len() + requested.len());
    let mut merged = Vec::with_capacity(existing.len() + requested.len());

    for subject in existing.iter().chain(requested) {
        if seen.insert(subject.as_str()) {
            merged.push(subject.clone());
        }
    }

    merged
}

/// NATS subject pattern match
///
/// `*` matches exactly one token, `>` matches one or more trailing
/// tokens. Tokens are literal otherwise.
pub(crate) fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subjects(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_unions_disjoint_sets() {
        let merged = merge_subjects(&subjects(&["events.*"]), &subjects(&["orders.*"]));
        assert_eq!(merged, subjects(&["events.*", "orders.*"]));
    }

    #[test]
    fn merge_deduplicates_overlap() {
        let merged = merge_subjects(
            &subjects(&["events.*", "orders.*"]),
            &subjects(&["orders.*", "billing.>"]),
        );
        assert_eq!(merged, subjects(&["events.*", "orders.*", "billing.>"]));
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = subjects(&["events.*", "orders.*"]);
        let merged = merge_subjects(&existing, &existing);
        assert_eq!(merged, existing);
    }

    #[test]
    fn merge_length_unchanged_means_nothing_new() {
        let existing = subjects(&["events.*"]);
        let merged = merge_subjects(&existing, &subjects(&["events.*"]));
        assert_eq!(merged.len(), existing.len());
    }

    #[test]
    fn literal_subjects_match_exactly() {
        assert!(subject_matches("events.guild.join", "events.guild.join"));
        assert!(!subject_matches("events.guild.join", "events.guild.leave"));
        assert!(!subject_matches("events.guild", "events.guild.join"));
        assert!(!subject_matches("events.guild.join", "events.guild"));
    }

    #[test]
    fn star_matches_exactly_one_token() {
        assert!(subject_matches("events.*", "events.join"));
        assert!(!subject_matches("events.*", "events.guild.join"));
        assert!(!subject_matches("events.*", "events"));
        assert!(subject_matches("events.*.join", "events.guild.join"));
    }

    #[test]
    fn gt_matches_one_or_more_trailing_tokens() {
        assert!(subject_matches("events.>", "events.join"));
        assert!(subject_matches("events.>", "events.guild.join"));
        assert!(!subject_matches("events.>", "events"));
        assert!(!subject_matches("events.>", "orders.created"));
    }
}
