//! Blends model predictions with historical frequency.
//!
//! The blended probability for a key is the arithmetic mean of the
//! predictor's probability for its top category and the historical share of
//! that same category. Results are memoized in a [`ProbabilityCache`] that
//! lives exactly as long as the aggregator that owns it.

use std::collections::HashMap;

use patrol_card_incident_models::{SlotKey, Weekday};
use patrol_card_predict::{PredictError, Predictor};

use crate::frequency::HistoricalFrequency;

/// Returns the arithmetic mean of two probabilities.
#[must_use]
pub fn blend(historical: f64, predicted: f64) -> f64 {
    (historical + predicted) / 2.0
}

/// Unbounded memo of blended probabilities keyed by
/// `(neighborhood, day, hour)`.
#[derive(Debug, Default, Clone)]
pub struct ProbabilityCache {
    entries: HashMap<SlotKey, f64>,
    hits: u64,
    misses: u64,
}

impl ProbabilityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&mut self, key: &SlotKey) -> Option<f64> {
        let value = self.entries.get(key).copied();
        if value.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        value
    }

    /// Returns the number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `(hits, misses)`.
    #[must_use]
    pub const fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Combines a [`Predictor`] with [`HistoricalFrequency`] behind a cache.
pub struct ProbabilityAggregator<'a> {
    predictor: &'a dyn Predictor,
    history: &'a HistoricalFrequency,
    cache: ProbabilityCache,
}

impl<'a> ProbabilityAggregator<'a> {
    /// Creates an aggregator with an empty cache.
    #[must_use]
    pub fn new(predictor: &'a dyn Predictor, history: &'a HistoricalFrequency) -> Self {
        Self {
            predictor,
            history,
            cache: ProbabilityCache::new(),
        }
    }

    /// Returns the blended probability for `(neighborhood, day, hour)`.
    ///
    /// The first call for a key queries the predictor and the history and
    /// stores the result. Later calls with the same key return the stored
    /// value without touching either.
    ///
    /// # Errors
    ///
    /// Propagates any [`PredictError`] from the predictor. Failures are not
    /// cached.
    pub fn blended_probability(
        &mut self,
        neighborhood: &str,
        day: Weekday,
        hour: u8,
    ) -> Result<f64, PredictError> {
        let key = SlotKey::new(neighborhood, day, hour);
        if let Some(cached) = self.cache.lookup(&key) {
            return Ok(cached);
        }

        let prediction = self.predictor.predict(neighborhood, day, hour)?;
        let historical = self.history.probability(&key, &prediction.category);
        let blended = blend(historical, prediction.probability);

        log::trace!(
            "{neighborhood} {day} {hour:02}h: predicted {:.3}, historical {historical:.3}, blended {blended:.3}",
            prediction.probability
        );

        self.cache.entries.insert(key, blended);
        Ok(blended)
    }

    /// Returns the aggregator's cache.
    #[must_use]
    pub const fn cache(&self) -> &ProbabilityCache {
        &self.cache
    }
}
