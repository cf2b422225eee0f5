//! Feature encoding: categorical labels to codes, numeric standardization.

/// Number of input features: neighborhood code, day of week, hour.
pub const N_FEATURES: usize = 3;

/// A feature vector `[neighborhood_code, day, hour]`.
pub type Features = [f64; N_FEATURES];

/// Maps a fixed set of labels to dense integer codes.
///
/// Codes are assigned in sorted label order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fits the encoder to the distinct labels in `labels`.
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = labels.into_iter().map(str::to_string).collect();
        classes.sort_unstable();
        classes.dedup();
        Self { classes }
    }

    /// Returns the code of `label`, or `None` if it was not seen when fitting.
    #[must_use]
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    /// Returns the label for `code`.
    #[must_use]
    pub fn inverse(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Returns the fitted labels in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Returns the number of fitted labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no label was fitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Standardizes each feature to zero mean and unit variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardScaler {
    mean: Features,
    scale: Features,
}

impl StandardScaler {
    /// Fits means and standard deviations over `rows`.
    ///
    /// Columns with zero variance keep a scale of 1 so they map to 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(rows: &[Features]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; N_FEATURES];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }

        let mut scale = [0.0; N_FEATURES];
        for row in rows {
            for ((s, x), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (x - m).powi(2) / n;
            }
        }
        for s in &mut scale {
            *s = if *s > f64::EPSILON { s.sqrt() } else { 1.0 };
        }

        Self { mean, scale }
    }

    /// Standardizes a single row.
    #[must_use]
    pub fn transform(&self, row: &Features) -> Features {
        std::array::from_fn(|i| (row[i] - self.mean[i]) / self.scale[i])
    }
}
