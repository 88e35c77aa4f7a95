//! Label acquisition: race a remote generator against a timeout
//!
//! The timeout is supplied by the caller as a future so the race works on
//! any executor (a tokio timer on the server, a browser timer in wasm).

use std::future::Future;

use futures_util::future::{select, Either};
use futures_util::pin_mut;

use crate::label::{LabelEntry, LabelError, LabelSet, LabelSource};
use crate::organ::OrganKey;

/// Default time allowed for a generation request, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A source of generated label entries for an organ
pub trait LabelGenerator {
    fn generate(
        &self,
        organ: OrganKey,
    ) -> impl Future<Output = Result<Vec<LabelEntry>, LabelError>> + Send;
}

/// Result of one generation attempt
#[derive(Debug)]
pub enum GenerationOutcome {
    Generated(Vec<LabelEntry>),
    TimedOut,
    Failed(LabelError),
}

/// Run `generator` for `organ` until it finishes or `timeout` resolves
pub async fn race_generation<G, T>(generator: &G, organ: OrganKey, timeout: T) -> GenerationOutcome
where
    G: LabelGenerator,
    T: Future<Output = ()>,
{
    let request = generator.generate(organ);
    pin_mut!(request);
    pin_mut!(timeout);

    match select(request, timeout).await {
        Either::Left((Ok(labels), _)) if labels.is_empty() => GenerationOutcome::Failed(LabelError::Empty),
        Either::Left((Ok(labels), _)) => GenerationOutcome::Generated(labels),
        Either::Left((Err(e), _)) => GenerationOutcome::Failed(e),
        Either::Right(((), _)) => GenerationOutcome::TimedOut,
    }
}

impl GenerationOutcome {
    /// Label set for this outcome, falling back to the static table
    pub fn into_label_set(self, organ: OrganKey) -> LabelSet {
        match self {
            GenerationOutcome::Generated(labels) => LabelSet {
                organ,
                source: LabelSource::Generated,
                labels,
            },
            GenerationOutcome::TimedOut => {
                tracing::warn!(%organ, "Label generation timed out, using fallback labels");
                LabelSet::fallback(organ)
            }
            GenerationOutcome::Failed(e) => {
                tracing::warn!(%organ, error = %e, "Label generation failed, using fallback labels");
                LabelSet::fallback(organ)
            }
        }
    }
}

/// Labels for `organ`: generated when a generator is available and answers
/// in time, otherwise the static table
pub async fn generate_organ_labels<G, T>(generator: Option<&G>, organ: OrganKey, timeout: T) -> LabelSet
where
    G: LabelGenerator,
    T: Future<Output = ()>,
{
    match generator {
        Some(generator) => race_generation(generator, organ, timeout).await.into_label_set(organ),
        None => {
            tracing::debug!(%organ, "Label generation disabled");
            LabelSet::fallback(organ)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::fallback_labels;
    use std::time::Duration;

    struct FixedGenerator {
        delay: Duration,
        response: fn() -> Result<Vec<LabelEntry>, LabelError>,
    }

    impl LabelGenerator for FixedGenerator {
        fn generate(
            &self,
            _organ: OrganKey,
        ) -> impl Future<Output = Result<Vec<LabelEntry>, LabelError>> + Send {
            let delay = self.delay;
            let response = self.response;
            async move {
                tokio::time::sleep(delay).await;
                response()
            }
        }
    }

    fn one_label() -> Result<Vec<LabelEntry>, LabelError> {
        Ok(vec![LabelEntry {
            name: "Renal Hilum".to_string(),
            description: "Entry point for vessels".to_string(),
            position: [0.0, 0.0, 0.0],
        }])
    }

    fn timeout(ms: u64) -> impl Future<Output = ()> {
        tokio::time::sleep(Duration::from_millis(ms))
    }

    #[tokio::test]
    async fn test_fast_generator_wins() {
        let generator = FixedGenerator { delay: Duration::ZERO, response: one_label };
        let set = generate_organ_labels(Some(&generator), OrganKey::Kidney1, timeout(1_000)).await;
        assert_eq!(set.source, LabelSource::Generated);
        assert_eq!(set.labels.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_generator_falls_back() {
        let generator = FixedGenerator { delay: Duration::from_secs(5), response: one_label };
        let outcome = race_generation(&generator, OrganKey::Kidney1, timeout(20)).await;
        assert!(matches!(outcome, GenerationOutcome::TimedOut));

        let set = outcome.into_label_set(OrganKey::Kidney1);
        assert_eq!(set.source, LabelSource::Fallback);
        assert_eq!(set.labels, fallback_labels(OrganKey::Kidney1));
    }

    #[tokio::test]
    async fn test_failed_generator_falls_back() {
        let generator = FixedGenerator {
            delay: Duration::ZERO,
            response: || Err(LabelError::Status(503)),
        };
        let set = generate_organ_labels(Some(&generator), OrganKey::Heart, timeout(1_000)).await;
        assert_eq!(set.source, LabelSource::Fallback);
        assert_eq!(set.labels, fallback_labels(OrganKey::Heart));
    }

    #[tokio::test]
    async fn test_empty_generation_is_a_failure() {
        let generator = FixedGenerator { delay: Duration::ZERO, response: || Ok(Vec::new()) };
        let outcome = race_generation(&generator, OrganKey::Lung, timeout(1_000)).await;
        assert!(matches!(outcome, GenerationOutcome::Failed(LabelError::Empty)));
    }

    #[tokio::test]
    async fn test_disabled_generation_uses_table() {
        let set = generate_organ_labels::<FixedGenerator, _>(None, OrganKey::Kidney1, timeout(0)).await;
        assert_eq!(set.source, LabelSource::Fallback);
        assert_eq!(set.labels.len(), 10);
    }
}
