//! Empirical crime category frequencies.

use std::collections::{BTreeMap, HashMap};

use patrol_card_incident_models::{IncidentRecord, SlotKey};

#[derive(Debug, Default, Clone)]
struct CategoryCounts {
    total: u64,
    by_category: BTreeMap<String, u64>,
}

impl CategoryCounts {
    fn add(&mut self, category: &str) {
        self.total += 1;
        *self.by_category.entry(category.to_string()).or_default() += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn share(&self, category: &str) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let count = self.by_category.get(category).copied().unwrap_or(0);
        Some(count as f64 / self.total as f64)
    }
}

/// Historical share of each crime category per `(neighborhood, day, hour)`.
///
/// Built once per generation run and shared read-only by the day workers.
#[derive(Debug, Default, Clone)]
pub struct HistoricalFrequency {
    by_slot: HashMap<SlotKey, CategoryCounts>,
    by_neighborhood: HashMap<String, CategoryCounts>,
}

impl HistoricalFrequency {
    /// Counts every record by slot and by neighborhood.
    #[must_use]
    pub fn from_records(records: &[IncidentRecord]) -> Self {
        let mut frequency = Self::default();
        for record in records {
            frequency
                .by_slot
                .entry(SlotKey::new(&record.neighborhood, record.day, record.hour))
                .or_default()
                .add(&record.category);
            frequency
                .by_neighborhood
                .entry(record.neighborhood.clone())
                .or_default()
                .add(&record.category);
        }
        frequency
    }

    /// Returns the historical probability of `category` at `key`.
    ///
    /// This is the share of incidents at exactly that neighborhood, day and
    /// hour that had `category`. When no incident was recorded at the key
    /// the neighborhood-wide share is used instead, and 0 when the
    /// neighborhood has no history at all.
    #[must_use]
    pub fn probability(&self, key: &SlotKey, category: &str) -> f64 {
        self.by_slot
            .get(key)
            .and_then(|counts| counts.share(category))
            .or_else(|| {
                self.by_neighborhood
                    .get(&key.neighborhood)
                    .and_then(|counts| counts.share(category))
            })
            .unwrap_or(0.0)
    }

    /// Returns the number of incidents recorded at `key`.
    #[must_use]
    pub fn count(&self, key: &SlotKey) -> u64 {
        self.by_slot.get(key).map_or(0, |counts| counts.total)
    }
}

#[cfg(test)]
mod tests {
    use patrol_card_incident_models::Weekday;

    use super::*;

    fn record(neighborhood: &str, day: Weekday, hour: u8, category: &str) -> IncidentRecord {
        IncidentRecord {
            neighborhood: neighborhood.to_string(),
            day,
            hour,
            category: category.to_string(),
            latitude: -16.0,
            longitude: -46.0,
            street: String::new(),
            occurred_on: None,
        }
    }

    #[test]
    fn share_at_exact_slot() {
        let frequency = HistoricalFrequency::from_records(&[
            record("Centro", Weekday::Monday, 10, "FURTO"),
            record("Centro", Weekday::Monday, 10, "FURTO"),
            record("Centro", Weekday::Monday, 10, "FURTO"),
            record("Centro", Weekday::Monday, 10, "ROUBO"),
            record("Centro", Weekday::Monday, 11, "ROUBO"),
        ]);
        let key = SlotKey::new("Centro", Weekday::Monday, 10);
        assert!((frequency.probability(&key, "FURTO") - 0.75).abs() < f64::EPSILON);
        assert!((frequency.probability(&key, "ROUBO") - 0.25).abs() < f64::EPSILON);
        assert!(frequency.probability(&key, "AMEACA").abs() < f64::EPSILON);
        assert_eq!(frequency.count(&key), 4);
    }

    #[test]
    fn falls_back_to_neighborhood_share() {
        let frequency = HistoricalFrequency::from_records(&[
            record("Centro", Weekday::Monday, 10, "FURTO"),
            record("Centro", Weekday::Tuesday, 3, "ROUBO"),
        ]);
        let key = SlotKey::new("Centro", Weekday::Sunday, 23);
        assert_eq!(frequency.count(&key), 0);
        assert!((frequency.probability(&key, "FURTO") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_neighborhood_has_zero_probability() {
        let frequency =
            HistoricalFrequency::from_records(&[record("Centro", Weekday::Monday, 10, "FURTO")]);
        let key = SlotKey::new("Nowhere", Weekday::Monday, 10);
        assert!(frequency.probability(&key, "FURTO").abs() < f64::EPSILON);
    }
}
